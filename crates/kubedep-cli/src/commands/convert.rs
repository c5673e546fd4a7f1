use super::{write_atomic, EXIT_SUCCESS};
use kubedep_core::{
    CachingDeducer, ChainDeducer, ConflictPolicy, ConvertOptions, Converter, CoreError,
    FlattenError, StaticDeducer,
};
use kubedep_remote::{FileSource, GoGetDeducer, HttpSource, RemoteError, SnapshotSource};
use kubedep_schema::{parse_profile_file, PlatformVersion, Profile};
use std::path::Path;

/// Arguments of `kubedep convert`.
pub struct ConvertRequest<'a> {
    pub version: &'a PlatformVersion,
    pub profile: Option<&'a Path>,
    pub snapshot: Option<&'a Path>,
    pub offline: bool,
    pub conflict_policy: ConflictPolicy,
    pub json: bool,
    pub output: Option<&'a Path>,
}

pub fn load_profile(path: Option<&Path>) -> Result<Profile, String> {
    let profile = match path {
        Some(path) => parse_profile_file(path),
        None => Profile::builtin(),
    };
    profile.map_err(|e| format!("profile error: {e}"))
}

fn snapshot_source(req: &ConvertRequest<'_>, profile: &Profile) -> Box<dyn SnapshotSource> {
    match req.snapshot {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new(&profile.snapshot_url)),
    }
}

fn deducer(offline: bool) -> ChainDeducer {
    let chain = ChainDeducer::new().then(StaticDeducer::new());
    if offline {
        chain
    } else {
        chain.then(CachingDeducer::new(GoGetDeducer::new()))
    }
}

fn remote_error(err: RemoteError) -> String {
    match err {
        RemoteError::Snapshot(e) => format!("snapshot error: {e}"),
        other => format!("fetch error: {other}"),
    }
}

fn core_error(err: CoreError) -> String {
    match err {
        CoreError::Flatten(e @ FlattenError::ConflictingRevision { .. }) => {
            format!("conflict: {e}")
        }
        other => other.to_string(),
    }
}

pub fn run(req: &ConvertRequest<'_>) -> Result<u8, String> {
    let profile = load_profile(req.profile)?;
    let source = snapshot_source(req, &profile);
    tracing::debug!("snapshot source: {}", source.describe());
    let snapshot = source.fetch(req.version).map_err(remote_error)?;

    let deducer = deducer(req.offline);
    let options = ConvertOptions {
        conflict_policy: req.conflict_policy,
    };
    let result = Converter::new(&profile, &deducer, options)
        .convert(&snapshot, req.version)
        .map_err(core_error)?;
    tracing::info!(
        "{} records flattened onto {} roots, {} constraints written",
        result.records,
        result.roots,
        result.manifest.overrides.len()
    );

    let rendered = if req.json {
        result.manifest.to_json()
    } else {
        result.manifest.to_toml()
    }
    .map_err(|e| format!("manifest error: {e}"))?;

    match req.output {
        Some(path) => {
            let mut content = rendered;
            if !content.ends_with('\n') {
                content.push('\n');
            }
            write_atomic(path, &content)?;
            tracing::info!("wrote {}", path.display());
        }
        None if rendered.ends_with('\n') => print!("{rendered}"),
        None => println!("{rendered}"),
    }
    Ok(EXIT_SUCCESS)
}
