use blake2::{Blake2b, Digest};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const HASH_CHUNK: usize = 1 << 16;

/// Blake2b-512 of a file's contents, streamed in fixed-size chunks so large
/// accumulators never have to sit in memory.
pub fn blake2b_file(path: &Path) -> io::Result<[u8; 64]> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Blake2b::new();
    let mut buf = vec![0u8; HASH_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.input(&buf[..n]);
    }
    let mut result = [0u8; 64];
    result.copy_from_slice(&hasher.result()[..64]);
    Ok(result)
}

pub fn blake2b_hex(path: &Path) -> io::Result<String> {
    Ok(hex::encode(&blake2b_file(path)?[..]))
}

/// Installs the fmt subscriber used by every binary. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn blake2b_bytes(data: &[u8]) -> [u8; 64] {
    let hash = Blake2b::digest(data);
    let mut result = [0u8; 64];
    result.copy_from_slice(&hash[..64]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_hash_matches_in_memory_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data = vec![7u8; HASH_CHUNK * 2 + 13];
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        assert_eq!(blake2b_file(file.path()).unwrap()[..], blake2b_bytes(&data)[..]);
        assert_eq!(blake2b_hex(file.path()).unwrap().len(), 128);
    }
}
