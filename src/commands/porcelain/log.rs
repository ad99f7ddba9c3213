use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::log::rev_list::RevList;

impl Repository {
    /// First-parent history starting at `revision`, or at HEAD when `None`.
    ///
    /// HEAD on a branch without commits yields an empty history; an explicit
    /// revision that does not resolve is an error.
    pub fn log(&self, revision: Option<&str>) -> anyhow::Result<RevList<'_>> {
        let start = match revision {
            Some(revision) => Some(Revision::try_parse(revision)?.resolve(self)?),
            None => self.refs().read_head()?,
        };

        Ok(RevList::new(self.database(), start))
    }
}
