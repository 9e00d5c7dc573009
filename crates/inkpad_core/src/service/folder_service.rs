//! Folder use-case service.
//!
//! # Responsibility
//! - Provide folder create/rename/delete/list APIs.
//! - Assign stable sort orders to new folders.
//!
//! # Invariants
//! - Deleting a folder re-parents its notes to the root; notes are never
//!   deleted with their folder.

use crate::model::note::{Folder, FolderId};
use crate::repo::folder_repo::FolderRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for folder use-cases.
#[derive(Debug)]
pub enum FolderServiceError {
    /// Folder name is empty after trimming.
    EmptyName,
    /// Target folder does not exist.
    FolderNotFound(FolderId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for FolderServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "folder name must not be empty"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent folder state: {details}"),
        }
    }
}

impl Error for FolderServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FolderServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Folder service facade over repository implementations.
pub struct FolderService<R: FolderRepository> {
    repo: R,
}

impl<R: FolderRepository> FolderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one folder appended to the end of the display order.
    pub fn create_folder(&mut self, name: &str) -> Result<Folder, FolderServiceError> {
        let name = non_empty_name(name)?;
        let sort_order = self.repo.next_sort_order()?;
        let folder = Folder::new(name, sort_order);
        self.repo.create_folder(&folder)?;
        self.repo
            .get_folder(folder.id)?
            .ok_or(FolderServiceError::InconsistentState(
                "created folder not found in read-back",
            ))
    }

    pub fn get_folder(&self, id: FolderId) -> Result<Option<Folder>, FolderServiceError> {
        Ok(self.repo.get_folder(id)?)
    }

    pub fn list_folders(&self) -> Result<Vec<Folder>, FolderServiceError> {
        Ok(self.repo.list_folders()?)
    }

    pub fn rename_folder(
        &mut self,
        id: FolderId,
        name: &str,
    ) -> Result<Folder, FolderServiceError> {
        let name = non_empty_name(name)?;
        if self.repo.rename_folder(id, &name)? == 0 {
            return Err(FolderServiceError::FolderNotFound(id));
        }
        self.repo
            .get_folder(id)?
            .ok_or(FolderServiceError::InconsistentState(
                "renamed folder not found in read-back",
            ))
    }

    /// Deletes one folder; its notes move to the root.
    pub fn delete_folder(&mut self, id: FolderId) -> Result<(), FolderServiceError> {
        if self.repo.delete_folder(id)? == 0 {
            return Err(FolderServiceError::FolderNotFound(id));
        }
        Ok(())
    }
}

fn non_empty_name(name: &str) -> Result<String, FolderServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FolderServiceError::EmptyName);
    }
    Ok(trimmed.to_string())
}
