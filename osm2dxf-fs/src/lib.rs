//! Filesystem helpers for reading map data and writing drawings.
//!
//! Inputs are opened through `cap-std` with UTF-8 paths from `camino`.
//! Outputs are written to a temporary sibling file and renamed over the
//! target, so a failed conversion never leaves a truncated drawing behind.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io::{self, BufWriter, Write};
use std::path::Component;

const TEMP_PREFIX: &str = ".osm2dxf-";
const TEMP_SUFFIX: &str = ".tmp";

/// Open an input file for reading.
pub fn open_input(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Whether `path` names an existing regular file.
///
/// A missing parent directory or file yields `Ok(false)`.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = parent_or_current(path);
    let Some(name) = path.file_name() else {
        return Ok(false);
    };
    let dir = match fs_utf8::Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Create every missing directory above `path`.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Write `path` atomically.
///
/// `write` fills a buffered temporary file created next to `path`. The file
/// is flushed and synced before being renamed over `path`. On any error the
/// temporary file is removed and `path` is left untouched.
///
/// # Examples
/// ```
/// use camino::Utf8PathBuf;
/// use std::io::Write;
///
/// # fn main() -> std::io::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let target = Utf8PathBuf::from_path_buf(dir.path().join("out/plan.dxf")).expect("utf-8");
/// osm2dxf_fs::write_atomic(&target, |out| out.write_all(b"0\nEOF\n"))?;
/// assert_eq!(std::fs::read(&target)?, b"0\nEOF\n");
/// # Ok(())
/// # }
/// ```
pub fn write_atomic<F>(path: &Utf8Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    ensure_parent_dir(path)?;
    let parent = parent_or_current(path);
    let temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent.as_std_path())?;

    let mut out = BufWriter::new(temp);
    write(&mut out)?;
    let temp = out.into_inner().map_err(io::IntoInnerError::into_error)?;
    temp.as_file().sync_all()?;
    temp.persist(path.as_std_path()).map_err(|err| err.error)?;
    Ok(())
}

/// Output path derived from an input path: same stem, `.dxf` extension.
///
/// Compound map extensions such as `.osm.pbf` are removed entirely.
///
/// # Examples
/// ```
/// use camino::Utf8Path;
///
/// let out = osm2dxf_fs::default_output_path(Utf8Path::new("maps/berlin.osm.pbf"));
/// assert_eq!(out, "maps/berlin.dxf");
/// ```
pub fn default_output_path(input: &Utf8Path) -> Utf8PathBuf {
    let mut output = input.to_path_buf();
    if output.extension() == Some("pbf") {
        output.set_extension("");
    }
    output.set_extension("dxf");
    output
}

fn parent_or_current(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

/// Split a path into an ambient base directory and a relative suffix, so
/// cap-std can create directories below absolute roots.
fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn utf8(dir: &TempDir, relative: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(relative)).expect("utf-8 temp path")
    }

    fn leftovers(dir: &Utf8Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .expect("read dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect()
    }

    #[rstest]
    fn writes_through_missing_directories(scratch: TempDir) {
        let target = utf8(&scratch, "a/b/plan.dxf");
        write_atomic(&target, |out| out.write_all(b"payload")).expect("write succeeds");
        assert_eq!(std::fs::read(&target).expect("read back"), b"payload");
        assert!(is_regular_file(&target).expect("stat"));
    }

    #[rstest]
    fn failed_write_leaves_existing_target_untouched(scratch: TempDir) {
        let target = utf8(&scratch, "plan.dxf");
        std::fs::write(&target, b"previous").expect("seed target");

        let err = write_atomic(&target, |out| {
            out.write_all(b"partial")?;
            Err(io::Error::other("emitter failed"))
        })
        .expect_err("write must fail");

        assert_eq!(err.to_string(), "emitter failed");
        assert_eq!(std::fs::read(&target).expect("read back"), b"previous");
        let parent = target.parent().expect("has parent");
        assert!(leftovers(parent).is_empty(), "temporary file left behind");
    }

    #[rstest]
    fn missing_files_are_not_regular(scratch: TempDir) {
        assert!(!is_regular_file(&utf8(&scratch, "nope.osm")).expect("stat"));
        assert!(!is_regular_file(&utf8(&scratch, "missing/dir/nope.osm")).expect("stat"));
        assert!(!is_regular_file(&utf8(&scratch, "")).expect("stat"));
    }

    #[rstest]
    #[case("site.osm", "site.dxf")]
    #[case("maps/site.xml", "maps/site.dxf")]
    #[case("berlin.osm.pbf", "berlin.dxf")]
    #[case("noext", "noext.dxf")]
    fn derives_output_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(default_output_path(Utf8Path::new(input)), expected);
    }
}
