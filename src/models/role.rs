//! Role and membership domain models

use super::resource::{kinds, FieldValue, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use uuid::Uuid;

/// 可分配到集合上的监管角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Admin,
    Coach,
    AssignableCoach,
}

impl RoleKind {
    pub const ALL: [RoleKind; 3] = [RoleKind::Admin, RoleKind::Coach, RoleKind::AssignableCoach];

    pub fn as_str(self) -> &'static str {
        match self {
            RoleKind::Admin => "admin",
            RoleKind::Coach => "coach",
            RoleKind::AssignableCoach => "assignable_coach",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一个主体相对于目标的关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Role(RoleKind),
    /// 主体与目标是同一个用户
    Own,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Role(kind) => kind.fmt(f),
            Relation::Own => f.write_str("own"),
        }
    }
}

impl From<RoleKind> for Relation {
    fn from(kind: RoleKind) -> Self {
        Relation::Role(kind)
    }
}

/// 权限规则中声明的角色要求
///
/// 配置中以字符串表示：`all`、`own`（或 `self`）、`admin`、`coach`、`assignable_coach`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoleRequirement {
    /// 任何人，无需计算角色
    Anyone,
    Relation(Relation),
}

impl RoleRequirement {
    pub const OWN: RoleRequirement = RoleRequirement::Relation(Relation::Own);

    pub fn role_kind(self) -> Option<RoleKind> {
        match self {
            RoleRequirement::Relation(Relation::Role(kind)) => Some(kind),
            _ => None,
        }
    }
}

impl From<RoleKind> for RoleRequirement {
    fn from(kind: RoleKind) -> Self {
        RoleRequirement::Relation(Relation::Role(kind))
    }
}

impl From<Relation> for RoleRequirement {
    fn from(relation: Relation) -> Self {
        RoleRequirement::Relation(relation)
    }
}

impl FromStr for RoleRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "*" => Ok(RoleRequirement::Anyone),
            "own" | "self" => Ok(RoleRequirement::OWN),
            "admin" => Ok(RoleKind::Admin.into()),
            "coach" => Ok(RoleKind::Coach.into()),
            "assignable_coach" => Ok(RoleKind::AssignableCoach.into()),
            other => Err(format!(
                "Invalid role: {}. Must be one of: all, own, admin, coach, assignable_coach",
                other
            )),
        }
    }
}

impl TryFrom<String> for RoleRequirement {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoleRequirement> for String {
    fn from(req: RoleRequirement) -> Self {
        req.to_string()
    }
}

impl fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleRequirement::Anyone => f.write_str("all"),
            RoleRequirement::Relation(relation) => relation.fmt(f),
        }
    }
}

/// 有效关系集合
///
/// 超级用户得到的是全集（`universal`），不需要遍历层级。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    universal: bool,
    relations: BTreeSet<Relation>,
}

impl RoleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn universal() -> Self {
        Self {
            universal: true,
            relations: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, relation: impl Into<Relation>) {
        self.relations.insert(relation.into());
    }

    pub fn contains(&self, relation: impl Into<Relation>) -> bool {
        self.universal || self.relations.contains(&relation.into())
    }

    pub fn is_universal(&self) -> bool {
        self.universal
    }

    pub fn is_empty(&self) -> bool {
        !self.universal && self.relations.is_empty()
    }

    /// 显式包含的关系（全集时为空）
    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    /// 与要求的角色是否有交集
    pub fn satisfies(&self, required: &[RoleRequirement]) -> bool {
        required.iter().any(|req| match req {
            RoleRequirement::Anyone => true,
            RoleRequirement::Relation(relation) => self.contains(*relation),
        })
    }
}

impl FromIterator<Relation> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Relation>>(iter: I) -> Self {
        Self {
            universal: false,
            relations: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.universal {
            return f.write_str("{*}");
        }
        let names: Vec<String> = self.relations.iter().map(|r| r.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Role assignment (user <-> collection with role kind)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub collection_id: Uuid,
    pub kind: RoleKind,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn new(user_id: Uuid, collection_id: Uuid, kind: RoleKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            collection_id,
            kind,
            created_at: Utc::now(),
        }
    }
}

impl Resource for RoleAssignment {
    fn resource_kind(&self) -> &'static str {
        kinds::ROLE
    }

    fn this(&self) -> FieldValue<'_> {
        FieldValue::Record(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "user" => Some(FieldValue::UserId(self.user_id)),
            "collection" => Some(FieldValue::CollectionId(self.collection_id)),
            "kind" => Some(FieldValue::Other("role_kind")),
            _ => None,
        }
    }
}

/// Learner membership (user <-> collection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub collection_id: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: Uuid, collection_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            collection_id,
            created_at: Utc::now(),
        }
    }
}

impl Resource for Membership {
    fn resource_kind(&self) -> &'static str {
        kinds::MEMBERSHIP
    }

    fn this(&self) -> FieldValue<'_> {
        FieldValue::Record(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "user" => Some(FieldValue::UserId(self.user_id)),
            "collection" => Some(FieldValue::CollectionId(self.collection_id)),
            _ => None,
        }
    }
}
