pub mod compare;
pub mod generate;
pub mod probe;

use std::path::Path;

use digitprobe_core::{Mode, ProbeError, Result};

/// Resolve the ingestion mode from the `--integers` / `--alphabet` flags.
pub fn parse_mode(integers: bool, alphabet: Option<u32>) -> Result<Mode> {
    if integers {
        Mode::integers(alphabet)
    } else {
        Ok(Mode::Digits)
    }
}

/// Display label for an input path: its file name, or the full path when it
/// has none.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write `contents` to `path`, creating parent directories as needed.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ProbeError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| ProbeError::io(path, e))
}

/// Print the error and exit with its code.
pub fn exit_with(err: &ProbeError) -> ! {
    eprintln!("digitprobe: {err}");
    std::process::exit(err.exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_digits() {
        assert_eq!(parse_mode(false, None).unwrap(), Mode::Digits);
    }

    #[test]
    fn test_parse_mode_integers() {
        assert_eq!(
            parse_mode(true, Some(90)).unwrap(),
            Mode::Integers { alphabet: 90 }
        );
    }

    #[test]
    fn test_parse_mode_integers_without_alphabet() {
        let err = parse_mode(true, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_parse_mode_rejects_tiny_alphabet() {
        assert!(parse_mode(true, Some(1)).is_err());
    }

    #[test]
    fn test_file_label() {
        assert_eq!(file_label(Path::new("reports/pi.json")), "pi.json");
        assert_eq!(file_label(Path::new("/")), "/");
    }

    #[test]
    fn test_write_output_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/table.csv");
        write_output(&path, "a,b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
