//! 测试公共模块
//! 提供层级夹具和测试用的资源类型

#![allow(dead_code)]

use kolibri_authz::{
    models::{
        Collection, FieldValue, Membership, Principal, Resource, RoleAssignment, RoleKind,
    },
    repository::MemoryHierarchy,
};
use uuid::Uuid;

/// 测试层级
///
/// ```text
/// Riverside (alice: admin)
/// ├── Grade 4 (carol: coach)
/// │   ├── Readers (gina: coach; bob: learner)
/// │   └── Writers (sam: learner)
/// └── Grade 5 (olivia: learner)
/// Hilltop (dave: admin)
/// └── Grade 1 (erin: learner)
/// ```
pub struct Fixture {
    pub store: MemoryHierarchy,
    pub facility: Collection,
    pub classroom: Collection,
    pub group: Collection,
    pub sibling_group: Collection,
    pub other_classroom: Collection,
    pub alice: Principal,
    pub carol: Principal,
    pub gina: Principal,
    pub bob: Principal,
    pub sam: Principal,
    pub olivia: Principal,
    pub nobody: Principal,
    pub other_facility: Collection,
    pub remote_classroom: Collection,
    pub dave: Principal,
    pub erin: Principal,
    pub root: Principal,
}

impl Fixture {
    /// 所有非匿名主体
    pub fn principals(&self) -> Vec<&Principal> {
        vec![
            &self.alice,
            &self.carol,
            &self.gina,
            &self.bob,
            &self.sam,
            &self.olivia,
            &self.nobody,
            &self.dave,
            &self.erin,
            &self.root,
        ]
    }

    pub fn collections(&self) -> Vec<&Collection> {
        vec![
            &self.facility,
            &self.classroom,
            &self.group,
            &self.sibling_group,
            &self.other_classroom,
            &self.other_facility,
            &self.remote_classroom,
        ]
    }
}

fn add_user(store: &mut MemoryHierarchy, username: &str, facility: &Collection) -> Principal {
    let user = Principal::facility_user(username, facility);
    store.add_user(user.clone()).expect("Failed to add user");
    user
}

pub fn assign(store: &mut MemoryHierarchy, user: &Principal, collection: &Collection, kind: RoleKind) {
    store
        .assign_role(RoleAssignment::new(user.id().unwrap(), collection.id, kind))
        .expect("Failed to assign role");
}

pub fn enroll(store: &mut MemoryHierarchy, user: &Principal, collection: &Collection) {
    store
        .add_membership(Membership::new(user.id().unwrap(), collection.id))
        .expect("Failed to add membership");
}

/// 创建测试层级
pub fn fixture() -> Fixture {
    let mut store = MemoryHierarchy::new();

    let facility = Collection::new_facility("Riverside");
    let classroom = Collection::new_classroom("Grade 4", &facility);
    let group = Collection::new_learner_group("Readers", &classroom);
    let sibling_group = Collection::new_learner_group("Writers", &classroom);
    let other_classroom = Collection::new_classroom("Grade 5", &facility);
    let other_facility = Collection::new_facility("Hilltop");
    let remote_classroom = Collection::new_classroom("Grade 1", &other_facility);

    for collection in [
        &facility,
        &classroom,
        &group,
        &sibling_group,
        &other_classroom,
        &other_facility,
        &remote_classroom,
    ] {
        store
            .add_collection(collection.clone())
            .expect("Failed to add collection");
    }

    let alice = add_user(&mut store, "alice", &facility);
    let carol = add_user(&mut store, "carol", &facility);
    let gina = add_user(&mut store, "gina", &facility);
    let bob = add_user(&mut store, "bob", &facility);
    let sam = add_user(&mut store, "sam", &facility);
    let olivia = add_user(&mut store, "olivia", &facility);
    let nobody = add_user(&mut store, "nobody", &facility);
    let dave = add_user(&mut store, "dave", &other_facility);
    let erin = add_user(&mut store, "erin", &other_facility);

    let root = Principal::device_owner("root");
    store.add_user(root.clone()).expect("Failed to add device owner");

    assign(&mut store, &alice, &facility, RoleKind::Admin);
    assign(&mut store, &carol, &classroom, RoleKind::Coach);
    assign(&mut store, &gina, &group, RoleKind::Coach);
    assign(&mut store, &dave, &other_facility, RoleKind::Admin);

    enroll(&mut store, &bob, &group);
    enroll(&mut store, &sam, &sibling_group);
    enroll(&mut store, &olivia, &other_classroom);
    enroll(&mut store, &erin, &remote_classroom);

    Fixture {
        store,
        facility,
        classroom,
        group,
        sibling_group,
        other_classroom,
        alice,
        carol,
        gina,
        bob,
        sam,
        olivia,
        nobody,
        other_facility,
        remote_classroom,
        dave,
        erin,
        root,
    }
}

/// 测试用资源：挂在某个集合下、由某个用户创建的课程
#[derive(Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub collection_id: Option<Uuid>,
    pub author_id: Uuid,
}

impl Lesson {
    pub fn new(title: &str, collection: &Collection, author: &Principal) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            collection_id: Some(collection.id),
            author_id: author.id().unwrap(),
        }
    }
}

impl Resource for Lesson {
    fn resource_kind(&self) -> &'static str {
        "lesson"
    }

    fn this(&self) -> FieldValue<'_> {
        FieldValue::Record(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "collection" => Some(
                self.collection_id
                    .map(FieldValue::CollectionId)
                    .unwrap_or(FieldValue::Null),
            ),
            "user" => Some(FieldValue::UserId(self.author_id)),
            "title" => Some(FieldValue::Other("string")),
            _ => None,
        }
    }
}

/// 嵌套资源：学习者对课程的提交
#[derive(Debug, Clone)]
pub struct Submission {
    pub lesson: Lesson,
    pub learner_id: Uuid,
}

impl Resource for Submission {
    fn resource_kind(&self) -> &'static str {
        "submission"
    }

    fn this(&self) -> FieldValue<'_> {
        FieldValue::Record(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "lesson" => Some(FieldValue::Record(&self.lesson)),
            "user" => Some(FieldValue::UserId(self.learner_id)),
            _ => None,
        }
    }
}
