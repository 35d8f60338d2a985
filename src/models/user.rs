//! User domain models

use super::{
    collection::Collection,
    resource::{kinds, FieldValue, Resource},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 参与授权判断的主体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Principal {
    /// 设备级超级用户，不属于任何 Facility
    DeviceOwner { id: Uuid, username: String },
    /// 属于且只属于一个 Facility 的用户
    FacilityUser {
        id: Uuid,
        username: String,
        facility_id: Uuid,
    },
    /// 未登录用户
    Anonymous,
}

impl Principal {
    pub fn device_owner(username: &str) -> Self {
        Principal::DeviceOwner {
            id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }

    /// 在给定集合所属的 Facility 下创建用户
    pub fn facility_user(username: &str, facility: &Collection) -> Self {
        Principal::FacilityUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            facility_id: facility.facility_id,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Principal::DeviceOwner { id, .. } | Principal::FacilityUser { id, .. } => Some(*id),
            Principal::Anonymous => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Principal::DeviceOwner { username, .. } | Principal::FacilityUser { username, .. } => {
                Some(username)
            }
            Principal::Anonymous => None,
        }
    }

    pub fn is_superuser(&self) -> bool {
        matches!(self, Principal::DeviceOwner { .. })
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn facility_id(&self) -> Option<Uuid> {
        match self {
            Principal::FacilityUser { facility_id, .. } => Some(*facility_id),
            _ => None,
        }
    }

    /// 两个主体是否为同一个已识别用户（匿名用户之间不相同）
    pub fn is_same(&self, other: &Principal) -> bool {
        matches!((self.id(), other.id()), (Some(a), Some(b)) if a == b)
    }
}

impl Resource for Principal {
    fn resource_kind(&self) -> &'static str {
        match self {
            Principal::DeviceOwner { .. } => kinds::DEVICE_OWNER,
            Principal::FacilityUser { .. } => kinds::FACILITY_USER,
            Principal::Anonymous => kinds::ANONYMOUS_USER,
        }
    }

    fn this(&self) -> FieldValue<'_> {
        FieldValue::User(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "facility" => Some(
                self.facility_id()
                    .map(FieldValue::CollectionId)
                    .unwrap_or(FieldValue::Null),
            ),
            "username" => Some(FieldValue::Other("string")),
            _ => None,
        }
    }
}
