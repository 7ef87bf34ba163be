use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "inmet_humidity_cache";
const CODE_WIDTH: usize = 7;

pub fn get_cache_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Cache path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Normalises an IBGE municipality code: the first run of digits, left-padded to 7.
///
/// Spreadsheets often store the code as a float (`5300108.0`), hence "first run".
pub fn normalize_code(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("{:0>width$}", digits, width = CODE_WIDTH))
    }
}

/// All digits of `raw`, zero-padded to 7, when there are six or seven of them.
///
/// Boundary files label their code property inconsistently, so this stricter check is
/// used when guessing which property holds the code.
pub fn code_from_all_digits(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if (6..=CODE_WIDTH).contains(&digits.len()) {
        Some(format!("{:0>width$}", digits, width = CODE_WIDTH))
    } else {
        None
    }
}
