//! Commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s), first parent first
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::ArborError;
use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use std::io::BufRead;

pub const AUTHOR_NAME_ENV: &str = "ARBOR_AUTHOR_NAME";
pub const AUTHOR_EMAIL_ENV: &str = "ARBOR_AUTHOR_EMAIL";
pub const AUTHOR_DATE_ENV: &str = "ARBOR_AUTHOR_DATE";

/// Author or committer information
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: DateTime<FixedOffset>,
}

impl Author {
    /// Create a new author with the current timestamp
    pub fn new(name: String, email: String) -> Self {
        Author {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(name: String, email: String, timestamp: DateTime<FixedOffset>) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    /// Build an author from explicit values, parsing an optional fixed date
    ///
    /// Dates are accepted as RFC 2822 or `%Y-%m-%d %H:%M:%S %z`.
    pub fn from_parts(name: String, email: String, date: Option<&str>) -> anyhow::Result<Self> {
        match date {
            Some(date) => {
                let timestamp = DateTime::parse_from_rfc2822(date)
                    .or_else(|_| DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S %z"))
                    .with_context(|| format!("invalid author date '{date}'"))?;
                Ok(Author::new_with_timestamp(name, email, timestamp))
            }
            None => Ok(Author::new(name, email)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// "Name <email> timestamp timezone"
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    fn validate(&self) -> Result<(), ArborError> {
        let forbidden = |value: &str| value.contains(['<', '>', '\n']);

        if forbidden(&self.name) || forbidden(&self.email) {
            Err(ArborError::malformed(
                "commit",
                format!("author {:?} contains '<', '>' or a newline", self.display_name()),
            ))
        } else {
            Ok(())
        }
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, digits) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl TryFrom<&str> for Author {
    type Error = ArborError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| ArborError::malformed("commit", format!("{reason}: {value:?}"));

        // "name <email> timestamp timezone"
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(invalid("invalid author line"));
        }

        let offset = parse_offset(parts[0]).ok_or_else(|| invalid("invalid timezone"))?;
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| invalid("invalid timestamp"))?;
        let name_email_part = parts[2];

        let email_start = name_email_part
            .find('<')
            .ok_or_else(|| invalid("missing '<'"))?;
        let email_end = name_email_part
            .rfind('>')
            .filter(|end| *end > email_start)
            .ok_or_else(|| invalid("missing '>'"))?;

        let name = name_email_part[..email_start].trim_end().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        let timestamp = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| invalid("timestamp out of range"))?
            .with_timezone(&offset);

        Ok(Author {
            name,
            email,
            timestamp,
        })
    }
}

/// Commit object
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent commit IDs (empty for the root commit, several for merges)
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    /// Create a new commit; the author also signs as committer
    pub fn new(parents: Vec<ObjectId>, tree_oid: ObjectId, author: Author, message: String) -> Self {
        Commit {
            parents,
            tree_oid,
            author: author.clone(),
            committer: author,
            message,
        }
    }

    /// First line of the commit message
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    /// First parent, the primary line of history
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.author.timestamp()
    }

    fn content(&self) -> String {
        let mut lines = vec![];

        lines.push(format!("tree {}", self.tree_oid));
        for parent in &self.parents {
            lines.push(format!("parent {}", parent));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines.push(String::new());
        lines.push(self.message.to_string());

        lines.join("\n")
    }
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        self.author.validate()?;
        self.committer.validate()?;

        frame(self.object_type(), self.content().as_bytes())
    }
}

impl Unpackable for Commit {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;

        let content = String::from_utf8(content)
            .map_err(|_| ArborError::malformed("commit", "content is not UTF-8"))?;
        let (headers, message) = content
            .split_once("\n\n")
            .ok_or_else(|| ArborError::malformed("commit", "missing message separator"))?;
        let mut lines = headers.split('\n');

        let tree_oid = lines
            .next()
            .and_then(|line| line.strip_prefix("tree "))
            .ok_or_else(|| ArborError::malformed("commit", "missing tree line"))?;
        let tree_oid = ObjectId::try_parse(tree_oid.to_string())
            .map_err(|e| ArborError::malformed("commit", e.to_string()))?;

        let mut parents = Vec::new();
        let mut next_line = lines
            .next()
            .ok_or_else(|| ArborError::malformed("commit", "missing author line"))?;

        while let Some(parent_oid) = next_line.strip_prefix("parent ") {
            parents.push(
                ObjectId::try_parse(parent_oid.to_string())
                    .map_err(|e| ArborError::malformed("commit", e.to_string()))?,
            );

            next_line = lines
                .next()
                .ok_or_else(|| ArborError::malformed("commit", "missing author line"))?;
        }

        let author = next_line
            .strip_prefix("author ")
            .ok_or_else(|| ArborError::malformed("commit", "invalid author line"))?;
        let author = Author::try_from(author)?;

        let committer = lines
            .next()
            .and_then(|line| line.strip_prefix("committer "))
            .ok_or_else(|| ArborError::malformed("commit", "missing committer line"))?;
        let committer = Author::try_from(committer)?;

        if lines.next().is_some() {
            return Err(ArborError::malformed("commit", "unexpected header line").into());
        }

        Ok(Commit {
            parents,
            tree_oid,
            author,
            committer,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        self.content()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::codec;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::io::Cursor;

    #[fixture]
    fn author() -> Author {
        Author::from_parts(
            "fake_user".to_string(),
            "fake_email@email.com".to_string(),
            Some("2023-01-01 12:00:00 +0200"),
        )
        .unwrap()
    }

    fn content_of(commit: &Commit) -> Vec<u8> {
        let bytes = commit.serialize().unwrap();
        let start = bytes.iter().position(|b| *b == 0).unwrap() + 1;
        bytes[start..].to_vec()
    }

    #[rstest]
    fn parses_back_a_merge_commit(author: Author) {
        let parents = vec![codec::hash(b"first"), codec::hash(b"second")];
        let commit = Commit::new(
            parents.clone(),
            codec::hash(b"tree"),
            author,
            "Merge\n\nwith a body\n".to_string(),
        );

        let parsed = Commit::deserialize(Cursor::new(content_of(&commit))).unwrap();

        assert_eq!(parsed.parents(), parents.as_slice());
        assert_eq!(parsed.parent(), Some(&parents[0]));
        assert_eq!(parsed, commit);
        assert_eq!(parsed.object_id().unwrap(), commit.object_id().unwrap());
    }

    #[rstest]
    fn author_line_keeps_the_timezone(author: Author) {
        assert_eq!(
            author.display(),
            "fake_user <fake_email@email.com> 1672567200 +0200"
        );
        assert_eq!(Author::try_from(author.display().as_str()).unwrap(), author);
    }

    #[test]
    fn author_with_angle_brackets_cannot_be_serialized() {
        let author = Author::new("evil <name>".to_string(), "e@x".to_string());
        let commit = Commit::new(vec![], codec::hash(b"tree"), author, "m".to_string());

        assert!(commit.serialize().is_err());
    }

    #[rstest]
    #[case(b"tree nope\n\nmsg".as_slice())]
    #[case(b"no separator at all".as_slice())]
    #[case(b"tree ce013625030ba8dba906f756967f9e9ca394464a\nauthor x\n\nmsg".as_slice())]
    fn malformed_commits_are_rejected(#[case] content: &[u8]) {
        let err = Commit::deserialize(Cursor::new(content.to_vec())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::MalformedObject { .. })
        ));
    }
}
