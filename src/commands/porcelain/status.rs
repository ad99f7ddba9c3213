use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::StatusReport;

impl Repository {
    /// Compare HEAD, the index and the working tree.
    ///
    /// Every working file is rehashed; nothing is written.
    pub async fn status(&self) -> anyhow::Result<StatusReport> {
        let index = self.index();
        let mut index = index.lock().await;
        index.rehydrate()?;

        let head_files = self.head_files()?;
        let workspace_files = self.workspace_files()?;

        Ok(StatusReport::compute(
            &head_files,
            index.entries(),
            &workspace_files,
        ))
    }
}
