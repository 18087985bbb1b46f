//! # Rename — Two Phases
//!
//! ```text
//! validate_rename(node, "Night")  ──►  RenamePlan   (pure, no side effects)
//! commit_rename(plan)
//!     1. move on disk         fails → nothing changed, error returned
//!     2. rewrite guid map     fails → disk moved back, error returned
//!     3. rename in memory
//!     4. forget cached scripts under the old path
//! ```
//!
//! The disk move is the step most likely to fail (another program holding a
//! file open), so it goes first. Guids never change.

use crate::error::{Result, SmithyError};
use crate::persist::paths::{self, AssetPath};
use crate::project::Project;
use crate::state::model::{Guid, NodeRef, unique_name};

/// A validated rename, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub target: NodeRef,
    pub guid: Guid,
    pub old_name: String,
    /// The requested name, suffixed if a sibling already has it.
    pub new_name: String,
    pub old_path: String,
    pub new_path: String,
}

impl RenamePlan {
    pub fn is_noop(&self) -> bool {
        self.old_name == self.new_name
    }
}

impl Project {
    pub fn validate_rename(&self, target: NodeRef, requested: &str) -> Result<RenamePlan> {
        match target {
            NodeRef::Scene(_) => paths::validate_scene_name(requested)?,
            _ => paths::validate_name(requested)?,
        }
        let doc = &self.doc;
        let old_name = doc.name_of(target)?.to_string();
        let new_name = unique_name(requested, |n| doc.sibling_has_name(target, n));
        let new_path = match target {
            NodeRef::Scene(_) => paths::scene_dir(&new_name),
            NodeRef::Room(s, _) => paths::room_dir(doc.name_of(NodeRef::Scene(s))?, &new_name),
            NodeRef::Variant(s, r, _) => paths::variant_script(
                doc.name_of(NodeRef::Scene(s))?,
                doc.name_of(NodeRef::Room(s, r))?,
                &new_name,
            ),
        };
        AssetPath::parse(&new_path)?;
        Ok(RenamePlan {
            target,
            guid: doc.guid_of(target)?,
            old_name,
            new_name,
            old_path: doc.asset_path(target)?,
            new_path,
        })
    }

    pub fn commit_rename(&mut self, plan: &RenamePlan) -> Result<()> {
        let current = self.doc.guid_of(plan.target)?;
        if current != plan.guid || self.doc.name_of(plan.target)? != plan.old_name {
            return Err(SmithyError::NotFound(format!(
                "{} '{}' (changed since the rename was validated)",
                plan.target.kind(),
                plan.old_name
            )));
        }
        if plan.is_noop() {
            return Ok(());
        }

        let from = self.abspath(&plan.old_path);
        let to = self.abspath(&plan.new_path);
        let moved = self.fs.exists(&from);
        if moved {
            self.fs.move_merge(&from, &to).map_err(|e| {
                let err = SmithyError::from_io(&from, e);
                log::error!("Rename of '{}' failed: {err}", plan.old_name);
                err
            })?;
        }

        if let Err(err) = self
            .guids
            .relocate(Some(plan.guid), &plan.old_path, &plan.new_path)
        {
            log::error!("Rename of '{}' failed: {err}", plan.old_name);
            if moved {
                if let Err(undo) = self.fs.move_merge(&to, &from) {
                    log::error!(
                        "Could not move {} back to {}: {undo}",
                        plan.new_path,
                        plan.old_path
                    );
                }
            }
            return Err(err);
        }
        self.doc.set_name(plan.target, plan.new_name.clone())?;
        self.registry.forget_prefix(&plan.old_path);
        let scene = match plan.target {
            NodeRef::Scene(s) | NodeRef::Room(s, _) | NodeRef::Variant(s, _, _) => s,
        };
        self.doc.mark_dirty(scene);
        log::info!(
            "Renamed {} '{}' to '{}'",
            plan.target.kind(),
            plan.old_name,
            plan.new_name
        );
        Ok(())
    }

    /// Validate and commit in one go. Returns the name actually given.
    pub fn rename(&mut self, target: NodeRef, requested: &str) -> Result<String> {
        let plan = self.validate_rename(target, requested)?;
        self.commit_rename(&plan)?;
        Ok(plan.new_name)
    }
}
