use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;

/// Print completions for the `kubedep` command tree to stdout.
#[allow(clippy::unnecessary_wraps)]
pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, String> {
    let mut command = C::command();
    let bin = command.get_name().to_owned();
    clap_complete::generate(shell, &mut command, bin, &mut std::io::stdout());
    Ok(EXIT_SUCCESS)
}
