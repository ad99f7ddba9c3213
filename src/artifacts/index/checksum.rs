use crate::artifacts::index::CHECKSUM_SIZE;
use crate::errors::ArborError;
use sha1::{Digest, Sha1};
use std::io::{self, Read, Write};

/// Hashes every byte that passes through it, in either direction.
#[derive(Debug)]
pub struct Checksum<T> {
    inner: T,
    digest: Sha1,
}

impl<T> Checksum<T> {
    pub fn new(inner: T) -> Self {
        Checksum {
            inner,
            digest: Sha1::new(),
        }
    }
}

impl<T: Read> Read for Checksum<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.digest.update(&buf[..read]);

        Ok(read)
    }
}

impl<T: Read> Checksum<T> {
    /// Compare the trailing checksum with the digest of everything read so far.
    pub fn verify(mut self) -> anyhow::Result<()> {
        let mut expected_checksum = [0u8; CHECKSUM_SIZE];
        self.inner
            .read_exact(&mut expected_checksum)
            .map_err(|_| ArborError::CorruptIndex("missing checksum".to_string()))?;

        let actual_checksum = self.digest.finalize();
        if expected_checksum != actual_checksum.as_slice() {
            return Err(ArborError::CorruptIndex(
                "checksum does not match value stored on disk".to_string(),
            )
            .into());
        }

        let mut trailing = [0u8; 1];
        if self.inner.read(&mut trailing)? != 0 {
            return Err(ArborError::CorruptIndex("trailing bytes after checksum".to_string()).into());
        }

        Ok(())
    }
}

impl<T: Write> Write for Checksum<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.digest.update(&buf[..written]);

        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<T: Write> Checksum<T> {
    /// Append the digest of everything written and hand back the inner writer.
    pub fn write_checksum(mut self) -> io::Result<T> {
        let checksum = self.digest.finalize();
        self.inner.write_all(checksum.as_slice())?;

        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn written_checksum_verifies() {
        let mut writer = Checksum::new(Vec::new());
        writer.write_all(b"some index bytes").unwrap();
        let bytes = writer.write_checksum().unwrap();

        let mut reader = Checksum::new(Cursor::new(bytes));
        let mut content = [0u8; 16];
        reader.read_exact(&mut content).unwrap();

        assert_eq!(&content, b"some index bytes");
        reader.verify().unwrap();
    }

    #[test]
    fn flipped_byte_fails_verification() {
        let mut writer = Checksum::new(Vec::new());
        writer.write_all(b"some index bytes").unwrap();
        let mut bytes = writer.write_checksum().unwrap();
        bytes[0] ^= 0xff;

        let mut reader = Checksum::new(Cursor::new(bytes));
        let mut content = [0u8; 16];
        reader.read_exact(&mut content).unwrap();

        let err = reader.verify().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::CorruptIndex(_))
        ));
    }
}
