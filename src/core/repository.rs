//! Repositories - Insertion-ordered collections keyed by identifier
//!
//! No cross-checking between the two kinds happens here; services own that.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::library::Library;
use super::profile::Profile;
use super::script::Script;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRepository {
    libraries: Vec<Library>,
}

impl LibraryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, library: Library) {
        self.libraries.push(library);
    }

    pub fn remove(&mut self, identifier: &Path) -> Option<Library> {
        let pos = self.libraries.iter().position(|l| l.has_id(identifier))?;
        Some(self.libraries.remove(pos))
    }

    pub fn find(&self, identifier: &Path) -> Option<&Library> {
        self.libraries.iter().find(|l| l.has_id(identifier))
    }

    pub fn find_mut(&mut self, identifier: &Path) -> Option<&mut Library> {
        self.libraries.iter_mut().find(|l| l.has_id(identifier))
    }

    pub fn find_script(&self, identifier: &Path) -> Option<&Script> {
        self.libraries.iter().find_map(|l| l.find(identifier))
    }

    pub fn find_script_mut(&mut self, identifier: &Path) -> Option<&mut Script> {
        self.libraries.iter_mut().find_map(|l| l.find_mut(identifier))
    }

    /// Library owning the script with the given identifier
    pub fn find_containing(&self, identifier: &Path) -> Option<&Library> {
        self.libraries.iter().find(|l| l.has_script(identifier))
    }

    pub fn find_containing_mut(&mut self, identifier: &Path) -> Option<&mut Library> {
        self.libraries.iter_mut().find(|l| l.has_script(identifier))
    }

    pub fn all_scripts(&self) -> impl Iterator<Item = &Script> {
        self.libraries.iter().flat_map(|l| l.scripts().iter())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Library> {
        self.libraries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Library> {
        self.libraries.iter_mut()
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&mut Library) -> bool) {
        self.libraries.retain_mut(keep);
    }

    pub fn clear(&mut self) {
        self.libraries.clear();
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl FromIterator<Library> for LibraryRepository {
    fn from_iter<I: IntoIterator<Item = Library>>(iter: I) -> Self {
        Self {
            libraries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRepository {
    profiles: Vec<Profile>,
}

impl ProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, profile: Profile) {
        self.profiles.push(profile);
    }

    pub fn remove(&mut self, identifier: &str) -> Option<Profile> {
        let pos = self.profiles.iter().position(|p| p.has_id(identifier))?;
        Some(self.profiles.remove(pos))
    }

    pub fn find(&self, identifier: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.has_id(identifier))
    }

    pub fn find_mut(&mut self, identifier: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.has_id(identifier))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Profile> {
        self.profiles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<Profile> for ProfileRepository {
    fn from_iter<I: IntoIterator<Item = Profile>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_resolve_across_libraries() {
        let mut first = Library::new("/one");
        first.add(Script::new("/one/a.ahk"));
        let mut second = Library::new("/two");
        second.add(Script::new("/two/b.ahk"));
        let repo: LibraryRepository = [first, second].into_iter().collect();

        assert_eq!(repo.find_script(Path::new("/two/b.ahk")).unwrap().name, "b");
        assert_eq!(
            repo.find_containing(Path::new("/one/a.ahk")).unwrap().path,
            Path::new("/one")
        );
        assert_eq!(repo.all_scripts().count(), 2);
        assert!(repo.find_script(Path::new("/three/c.ahk")).is_none());
    }

    #[test]
    fn profiles_keep_insertion_order() {
        let mut repo = ProfileRepository::new();
        repo.add(Profile::new("b"));
        repo.add(Profile::new("a"));
        let names: Vec<_> = repo.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(repo.remove("b").is_some());
        assert!(repo.find("b").is_none());
    }
}
