//! Folder tree of the catalog, rebuilt from the flat sample list.

use std::collections::BTreeMap;

use crate::catalog::{Directory, DirectoryId, Sample};

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Folder {
        name: String,
        directory_id: DirectoryId,
        /// Relative path of the folder; empty for a directory root.
        path: String,
        children: Vec<TreeNode>,
    },
    Sample(Sample),
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder { name, .. } => name,
            TreeNode::Sample(sample) => &sample.name,
        }
    }

    /// Number of samples at or below this node.
    pub fn sample_count(&self) -> usize {
        match self {
            TreeNode::Folder { children, .. } => children.iter().map(TreeNode::sample_count).sum(),
            TreeNode::Sample(_) => 1,
        }
    }
}

#[derive(Default)]
struct FolderBuilder {
    folders: BTreeMap<String, FolderBuilder>,
    samples: Vec<Sample>,
}

impl FolderBuilder {
    fn insert(&mut self, segments: &[&str], sample: Sample) {
        match segments.split_first() {
            Some((first, rest)) => self
                .folders
                .entry((*first).to_string())
                .or_default()
                .insert(rest, sample),
            None => self.samples.push(sample),
        }
    }

    fn into_children(self, directory_id: &DirectoryId, prefix: &str) -> Vec<TreeNode> {
        let mut children: Vec<TreeNode> = self
            .folders
            .into_iter()
            .map(|(name, folder)| {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                TreeNode::Folder {
                    children: folder.into_children(directory_id, &path),
                    name,
                    directory_id: directory_id.clone(),
                    path,
                }
            })
            .collect();
        let mut samples = self.samples;
        samples.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        children.extend(samples.into_iter().map(TreeNode::Sample));
        children
    }
}

/// One root folder per directory, folders before samples at each level.
///
/// Samples whose directory is not listed are left out.
pub fn build_tree(directories: &[Directory], samples: &[Sample]) -> Vec<TreeNode> {
    directories
        .iter()
        .map(|directory| {
            let mut root = FolderBuilder::default();
            for sample in samples.iter().filter(|s| s.directory_id == directory.id) {
                let segments: Vec<&str> = sample
                    .parent_path
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .collect();
                root.insert(&segments, sample.clone());
            }
            TreeNode::Folder {
                name: directory.name.clone(),
                directory_id: directory.id.clone(),
                path: String::new(),
                children: root.into_children(&directory.id, ""),
            }
        })
        .collect()
}
