//! Content-addressed object store
//!
//! Objects live under `objects/<first 2 hex>/<remaining 38 hex>`, holding the
//! codec-encoded canonical bytes. Writes go through a temporary file in the shard
//! directory and are renamed into place, so a reader never sees a partial object.

use crate::areas::atomic::write_atomic;
use crate::artifacts::codec::{self, Codec, ZlibCodec};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, ObjectBox};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::ArborError;
use anyhow::Context;
use bytes::Bytes;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Stored objects are read-only
const OBJECT_FILE_MODE: u32 = 0o444;

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    codec: Box<dyn Codec>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Self::with_codec(path, Box::new(ZlibCodec::default()))
    }

    pub fn with_codec(path: Box<Path>, codec: Box<dyn Codec>) -> Self {
        Database { path, codec }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Persist `object` unless it is already present and return its id.
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        let object_content = object.serialize()?;
        let oid = codec::hash(&object_content);
        let object_path = self.path.join(oid.to_path());

        if object_path.exists() {
            debug!(%oid, object_type = %object.object_type(), "object already stored");
            return Ok(oid);
        }

        let encoded = self.codec.encode(&object_content)?;
        write_atomic(&object_path, &encoded, OBJECT_FILE_MODE)
            .with_context(|| format!("Unable to write object file {}", object_path.display()))?;
        debug!(%oid, object_type = %object.object_type(), size = object_content.len(), "stored object");

        Ok(oid)
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.path.join(oid.to_path()).is_file()
    }

    /// Canonical bytes of an object, verified against its id.
    pub fn load_raw(&self, oid: &ObjectId) -> anyhow::Result<Bytes> {
        let object_path = self.path.join(oid.to_path());

        let encoded = match std::fs::read(&object_path) {
            Ok(encoded) => encoded,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArborError::ObjectNotFound(oid.clone()).into());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Unable to read object file {}", object_path.display())
                });
            }
        };

        let content = self
            .codec
            .decode(&encoded)
            .map_err(|err| ArborError::CorruptObject {
                oid: oid.clone(),
                reason: format!("{err:#}"),
            })?;

        let actual = codec::hash(&content);
        if &actual != oid {
            return Err(ArborError::IntegrityError {
                expected: oid.clone(),
                actual,
            }
            .into());
        }

        Ok(content)
    }

    pub fn load(&self, oid: &ObjectId) -> anyhow::Result<ObjectBox> {
        let content = self.load_raw(oid)?;
        let content_len = content.len();
        let mut reader = Cursor::new(content);

        let (object_type, size) = ObjectType::parse_header(&mut reader)?;
        if size != content_len - reader.position() as usize {
            return Err(ArborError::malformed(
                object_type.as_str(),
                format!("header declares {size} bytes of content"),
            )
            .into());
        }

        ObjectBox::parse(object_type, reader)
    }

    pub fn object_type(&self, oid: &ObjectId) -> anyhow::Result<ObjectType> {
        let content = self.load_raw(oid)?;
        let (object_type, _) = ObjectType::parse_header(&mut Cursor::new(content))?;

        Ok(object_type)
    }

    pub fn parse_object_as_blob(&self, oid: &ObjectId) -> anyhow::Result<Blob> {
        match self.load(oid)? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Self::unexpected(oid, ObjectType::Blob, &other)),
        }
    }

    pub fn parse_object_as_tree(&self, oid: &ObjectId) -> anyhow::Result<Tree> {
        match self.load(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            other => Err(Self::unexpected(oid, ObjectType::Tree, &other)),
        }
    }

    pub fn parse_object_as_commit(&self, oid: &ObjectId) -> anyhow::Result<Commit> {
        match self.load(oid)? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Self::unexpected(oid, ObjectType::Commit, &other)),
        }
    }

    fn unexpected(oid: &ObjectId, expected: ObjectType, actual: &ObjectBox) -> anyhow::Error {
        ArborError::UnexpectedObjectType {
            oid: oid.clone(),
            expected,
            actual: actual.object_type(),
        }
        .into()
    }

    /// Find all objects whose id starts with `prefix`.
    ///
    /// Only the shard directory named by the first two characters is scanned; shorter
    /// prefixes scan every shard.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        if !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Vec::new());
        }

        let prefix = prefix.to_ascii_lowercase();
        let shards = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        let mut matches = Vec::new();
        for shard in shards {
            let shard_path = self.path.join(&shard);
            if !shard_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&shard_path)
                .with_context(|| format!("Unable to list {}", shard_path.display()))?
            {
                let full_oid = format!("{}{}", shard, entry?.file_name().to_string_lossy());

                if full_oid.starts_with(&prefix) {
                    // temporary files left by interrupted writes are not objects
                    if let Ok(oid) = ObjectId::try_parse(full_oid) {
                        matches.push(oid);
                    }
                }
            }
        }
        matches.sort();

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::codec::IdentityCodec;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    struct Store {
        dir: tempfile::TempDir,
        database: Database,
    }

    #[fixture]
    fn store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());

        Store { dir, database }
    }

    fn object_files(path: &Path) -> usize {
        walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .count()
    }

    #[rstest]
    fn storing_twice_is_idempotent(store: Store) {
        let blob = Blob::new("same content");

        let first = store.database.store(&blob).unwrap();
        let second = store.database.store(&blob).unwrap();

        assert_eq!(first, second);
        assert_eq!(object_files(store.database.objects_path()), 1);
        assert_eq!(store.database.parse_object_as_blob(&first).unwrap(), blob);
    }

    #[rstest]
    fn missing_object_is_reported(store: Store) {
        let oid = codec::hash(b"never stored");
        let err = store.database.load(&oid).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::ObjectNotFound(_))
        ));
        assert!(!store.database.exists(&oid));
    }

    #[rstest]
    fn swapped_object_fails_integrity_check(store: Store) {
        let database = Database::with_codec(
            store.dir.path().join("plain").into_boxed_path(),
            Box::new(IdentityCodec),
        );
        let oid = database.store(&Blob::new("original")).unwrap();
        let object_path = database.objects_path().join(oid.to_path());

        let mut permissions = std::fs::metadata(&object_path).unwrap().permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        std::fs::set_permissions(&object_path, permissions).unwrap();
        std::fs::write(&object_path, b"blob 8\0tampered").unwrap();

        let err = database.load(&oid).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::IntegrityError { .. })
        ));
    }

    #[rstest]
    fn undecodable_object_is_corrupt(store: Store) {
        let oid = store.database.store(&Blob::new("original")).unwrap();
        let object_path = store.database.objects_path().join(oid.to_path());

        let mut permissions = std::fs::metadata(&object_path).unwrap().permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        std::fs::set_permissions(&object_path, permissions).unwrap();
        std::fs::write(&object_path, b"not zlib at all").unwrap();

        let err = store.database.load(&oid).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::CorruptObject { .. })
        ));
    }

    #[rstest]
    fn wrong_variant_is_rejected(store: Store) {
        let oid = store.database.store(&Blob::new("a blob")).unwrap();
        let err = store.database.parse_object_as_commit(&oid).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::UnexpectedObjectType {
                expected: ObjectType::Commit,
                actual: ObjectType::Blob,
                ..
            })
        ));
    }

    #[rstest]
    fn finds_objects_by_prefix(store: Store) {
        let oid = store.database.store(&Blob::new("hello\n")).unwrap();

        assert_eq!(
            store.database.find_objects_by_prefix("ce0136").unwrap(),
            vec![oid.clone()]
        );
        assert_eq!(store.database.find_objects_by_prefix("CE01").unwrap(), vec![oid]);
        assert!(store.database.find_objects_by_prefix("ffff").unwrap().is_empty());
    }
}
