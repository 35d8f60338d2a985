//! Collection hierarchy models (Facility → Classroom → LearnerGroup)

use super::resource::{kinds, FieldValue, Resource};
use crate::error::AuthzError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 集合类型，按层级深度排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Facility,
    Classroom,
    LearnerGroup,
}

impl CollectionKind {
    /// 层级深度，Facility 为 0
    pub fn depth(self) -> usize {
        match self {
            CollectionKind::Facility => 0,
            CollectionKind::Classroom => 1,
            CollectionKind::LearnerGroup => 2,
        }
    }

    /// 直接父级必须是的类型
    pub fn parent_kind(self) -> Option<CollectionKind> {
        match self {
            CollectionKind::Facility => None,
            CollectionKind::Classroom => Some(CollectionKind::Facility),
            CollectionKind::LearnerGroup => Some(CollectionKind::Classroom),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Facility => "facility",
            CollectionKind::Classroom => "classroom",
            CollectionKind::LearnerGroup => "learner_group",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 层级树中的一个节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub kind: CollectionKind,
    pub parent_id: Option<Uuid>,
    /// 所在树的根；Facility 自身即为根
    pub facility_id: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new_facility(name: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: name.to_string(),
            kind: CollectionKind::Facility,
            parent_id: None,
            facility_id: id,
            created_at: Utc::now(),
        }
    }

    pub fn new_classroom(name: &str, facility: &Collection) -> Self {
        Self::child_of(name, CollectionKind::Classroom, facility)
    }

    pub fn new_learner_group(name: &str, classroom: &Collection) -> Self {
        Self::child_of(name, CollectionKind::LearnerGroup, classroom)
    }

    fn child_of(name: &str, kind: CollectionKind, parent: &Collection) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            parent_id: Some(parent.id),
            facility_id: parent.facility_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_facility(&self) -> bool {
        self.kind == CollectionKind::Facility
    }

    /// 校验节点与其父节点的结构关系
    pub fn validate_parent(&self, parent: Option<&Collection>) -> Result<(), AuthzError> {
        match (self.kind.parent_kind(), parent) {
            (None, None) => {
                if self.facility_id != self.id {
                    return Err(AuthzError::Integrity(format!(
                        "facility {} must be the root of its own tree",
                        self.id
                    )));
                }
                Ok(())
            }
            (None, Some(parent)) => Err(AuthzError::Integrity(format!(
                "facility {} cannot have parent {}",
                self.id, parent.id
            ))),
            (Some(expected), None) => Err(AuthzError::Integrity(format!(
                "{} {} requires a {} parent",
                self.kind, self.id, expected
            ))),
            (Some(expected), Some(parent)) => {
                if parent.kind != expected {
                    return Err(AuthzError::Integrity(format!(
                        "{} {} cannot be a child of {} {}",
                        self.kind, self.id, parent.kind, parent.id
                    )));
                }
                if self.parent_id != Some(parent.id) || self.facility_id != parent.facility_id {
                    return Err(AuthzError::Integrity(format!(
                        "{} {} does not belong to the tree of {}",
                        self.kind, self.id, parent.id
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Resource for Collection {
    fn resource_kind(&self) -> &'static str {
        kinds::COLLECTION
    }

    fn this(&self) -> FieldValue<'_> {
        FieldValue::Collection(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "parent" => Some(
                self.parent_id
                    .map(FieldValue::CollectionId)
                    .unwrap_or(FieldValue::Null),
            ),
            "facility" => Some(FieldValue::CollectionId(self.facility_id)),
            "name" => Some(FieldValue::Other("string")),
            _ => None,
        }
    }
}
