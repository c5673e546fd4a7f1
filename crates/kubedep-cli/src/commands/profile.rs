use super::EXIT_SUCCESS;
use kubedep_schema::{parse_profile_file, BUILTIN_PROFILE};
use std::path::Path;

pub fn run(check: Option<&Path>) -> Result<u8, String> {
    let Some(path) = check else {
        print!("{BUILTIN_PROFILE}");
        return Ok(EXIT_SUCCESS);
    };

    let profile = parse_profile_file(path).map_err(|e| format!("profile error: {e}"))?;
    println!(
        "{}: ok ({} override rules, {} family projects, {} ignored patterns)",
        path.display(),
        profile.overrides.len(),
        profile.family.projects.len(),
        profile.ignored.len()
    );
    Ok(EXIT_SUCCESS)
}
