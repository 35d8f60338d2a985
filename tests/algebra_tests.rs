//! 规则组合测试
//!
//! Any / All 的短路、错误传播以及集合过滤语义

use kolibri_authz::{
    error::AuthzError,
    models::{Principal, Resource, RoleKind},
    permissions::{
        rule, shared, All, AllowAll, Any, DenyAll, IsFromSameFacility, IsOwn, Operation,
        PermissionRule, RoleBasedConfig, SharedRule,
    },
    RoleRelation,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

mod common;
use common::{fixture, Fixture, Lesson};

/// 记录调用次数的规则；`verdict` 为 None 时返回错误
#[derive(Debug, Clone)]
struct ProbeRule {
    verdict: Option<bool>,
    calls: Arc<AtomicUsize>,
}

impl ProbeRule {
    fn throwing() -> Self {
        Self {
            verdict: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self) -> Result<bool, AuthzError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
            .ok_or_else(|| AuthzError::Store("probe rule must not be evaluated".to_string()))
    }
}

impl PermissionRule for ProbeRule {
    fn user_can_create_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.answer()
    }

    fn user_can_read_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.answer()
    }

    fn user_can_update_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.answer()
    }

    fn user_can_delete_object(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        _obj: &dyn Resource,
    ) -> Result<bool, AuthzError> {
        self.answer()
    }

    fn readable_indices(
        &self,
        _rel: &RoleRelation<'_>,
        _user: &Principal,
        candidates: &[&dyn Resource],
    ) -> Result<Vec<usize>, AuthzError> {
        if self.answer()? {
            Ok((0..candidates.len()).collect())
        } else {
            Ok(Vec::new())
        }
    }
}

/// 每个集合下分别由 carol 和 gina 各创建一节课
fn lessons(f: &Fixture) -> Vec<Lesson> {
    f.collections()
        .into_iter()
        .flat_map(|collection| {
            [
                Lesson::new("by carol", collection, &f.carol),
                Lesson::new("by gina", collection, &f.gina),
            ]
        })
        .collect()
}

fn coach_reads_collection() -> SharedRule {
    shared(
        RoleBasedConfig::default()
            .target("collection")
            .read_by([RoleKind::Coach])
            .build()
            .unwrap(),
    )
}

fn point_read_indices(
    rule: &dyn PermissionRule,
    rel: &RoleRelation<'_>,
    user: &Principal,
    candidates: &[&dyn Resource],
) -> Vec<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, obj)| rule.user_can_read_object(rel, user, **obj).unwrap())
        .map(|(i, _)| i)
        .collect()
}

/// 测试 Any 在第一个允许后短路
#[test]
fn test_any_short_circuits_on_allow() {
    let f = fixture();
    let rel = RoleRelation::new(&f.store);
    let probe = ProbeRule::throwing();
    let any = Any::new([rule::<AllowAll>(), shared(probe.clone())]).unwrap();
    let lesson = Lesson::new("Fractions", &f.group, &f.carol);

    for op in Operation::ALL {
        assert!(any.user_can(op, &rel, &f.bob, &lesson).unwrap());
    }
    assert_eq!(probe.calls(), 0);
}

/// 测试 All 在第一个拒绝后短路
#[test]
fn test_all_short_circuits_on_deny() {
    let f = fixture();
    let rel = RoleRelation::new(&f.store);
    let probe = ProbeRule::throwing();
    let all = All::new([rule::<DenyAll>(), shared(probe.clone())]).unwrap();
    let lesson = Lesson::new("Fractions", &f.group, &f.carol);

    for op in Operation::ALL {
        assert!(!all.user_can(op, &rel, &f.bob, &lesson).unwrap());
    }
    assert_eq!(probe.calls(), 0);
}

/// 测试未短路时子规则的错误原样传播
#[test]
fn test_errors_propagate_when_reached() {
    let f = fixture();
    let rel = RoleRelation::new(&f.store);
    let lesson = Lesson::new("Fractions", &f.group, &f.carol);

    let any = Any::new([rule::<DenyAll>(), shared(ProbeRule::throwing())]).unwrap();
    assert!(matches!(
        any.user_can_read_object(&rel, &f.bob, &lesson),
        Err(AuthzError::Store(_))
    ));

    let all = All::new([rule::<AllowAll>(), shared(ProbeRule::throwing())]).unwrap();
    assert!(matches!(
        all.user_can_update_object(&rel, &f.bob, &lesson),
        Err(AuthzError::Store(_))
    ));
}

/// 测试空组合属于配置错误
#[test]
fn test_empty_composition_is_rejected() {
    assert!(matches!(
        Any::new(Vec::<SharedRule>::new()),
        Err(AuthzError::Configuration(_))
    ));
    assert!(matches!(
        All::new(Vec::<SharedRule>::new()),
        Err(AuthzError::Configuration(_))
    ));
}

/// 测试 Any 的过滤结果是各子规则结果的并集
#[test]
fn test_any_filter_returns_union() {
    let f = fixture();
    let rel = RoleRelation::new(&f.store);
    let items = lessons(&f);
    let candidates: Vec<&dyn Resource> = items.iter().map(|l| l as &dyn Resource).collect();

    let own = shared(IsOwn::default());
    let coach = coach_reads_collection();
    let any = Any::new([own.clone(), coach.clone()]).unwrap();

    let by_own = own.readable_indices(&rel, &f.gina, &candidates).unwrap();
    let by_coach = coach.readable_indices(&rel, &f.gina, &candidates).unwrap();
    let union = any.readable_indices(&rel, &f.gina, &candidates).unwrap();

    // gina 自己的 7 节课，加上 Readers 下 carol 的那一节
    assert_eq!(by_own.len(), 7);
    assert_eq!(by_coach.len(), 2);
    assert_eq!(union.len(), 8);
    assert!(union.windows(2).all(|w| w[0] < w[1]));
    assert!(by_own.iter().chain(&by_coach).all(|i| union.contains(i)));
    assert!(union.len() < candidates.len());

    assert_eq!(union, point_read_indices(&any, &rel, &f.gina, &candidates));
}

/// 测试 All 的过滤依次收窄
#[test]
fn test_all_filter_narrows_sequentially() {
    let f = fixture();
    let rel = RoleRelation::new(&f.store);
    let items = lessons(&f);
    let candidates: Vec<&dyn Resource> = items.iter().map(|l| l as &dyn Resource).collect();

    let all = All::new([
        shared(IsFromSameFacility::field("collection")),
        shared(IsOwn::default()),
    ])
    .unwrap();

    let readable = all.readable_indices(&rel, &f.carol, &candidates).unwrap();
    // Riverside 下的 5 个集合中 carol 各有一节课
    assert_eq!(readable.len(), 5);
    for &index in &readable {
        assert_eq!(items[index].author_id, f.carol.id().unwrap());
    }
    assert_eq!(readable, point_read_indices(&all, &rel, &f.carol, &candidates));
}

/// 测试过滤在结果确定后不再调用后续子规则
#[test]
fn test_filter_stops_when_settled() {
    let f = fixture();
    let rel = RoleRelation::new(&f.store);
    let items = lessons(&f);
    let candidates: Vec<&dyn Resource> = items.iter().map(|l| l as &dyn Resource).collect();

    let probe = ProbeRule::throwing();
    let any = Any::new([rule::<AllowAll>(), shared(probe.clone())]).unwrap();
    assert_eq!(
        any.readable_indices(&rel, &f.bob, &candidates).unwrap().len(),
        candidates.len()
    );

    let all = All::new([rule::<DenyAll>(), shared(probe.clone())]).unwrap();
    assert!(all.readable_indices(&rel, &f.bob, &candidates).unwrap().is_empty());

    assert_eq!(probe.calls(), 0);
}

/// 测试嵌套组合的过滤与逐个检查一致
#[test]
fn test_nested_composition_matches_point_checks() {
    let f = fixture();
    let rel = RoleRelation::new(&f.store);
    let items = lessons(&f);
    let candidates: Vec<&dyn Resource> = items.iter().map(|l| l as &dyn Resource).collect();

    let nested = Any::new([
        shared(
            All::new([
                shared(IsOwn::default()),
                shared(IsFromSameFacility::field("collection")),
            ])
            .unwrap(),
        ),
        coach_reads_collection(),
        shared(
            RoleBasedConfig::default()
                .target("collection")
                .read_by([RoleKind::Admin])
                .build()
                .unwrap(),
        ),
    ])
    .unwrap();

    let anonymous = Principal::Anonymous;
    let mut users = f.principals();
    users.push(&anonymous);

    for user in users {
        assert_eq!(
            nested.readable_indices(&rel, user, &candidates).unwrap(),
            point_read_indices(&nested, &rel, user, &candidates),
            "nested filter mismatch for {:?}",
            user
        );
    }

    let readable = nested
        .readable_by_user_filter(&rel, &f.alice, &candidates)
        .unwrap();
    assert_eq!(readable.len(), 10);
}
