#![cfg(feature = "criterion-bench")]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use futures::executor::block_on;
use std::sync::Arc;
use std::time::Duration;
use tenant_gate::{
    BindingManager, CheckContext, Checker, MemoryStore, NewRole, Permission, PermissionCache,
    RoleId, RoleManager, StoreResolver, SubjectContext, SubjectId, SubjectKind, TenantContext,
    TenantId,
};

fn setup_flat(checker_cache: PermissionCache) -> (Checker, CheckContext) {
    let store = MemoryStore::new();
    let tenant = TenantId::try_from("tenant_bench").unwrap();
    let subject = SubjectId::try_from("subject_bench").unwrap();
    let role = RoleId::try_from("role_reader").unwrap();

    let roles = RoleManager::new(store.clone(), checker_cache.clone());
    let bindings = BindingManager::new(store.clone(), checker_cache.clone());
    block_on(roles.create_role(
        &tenant,
        NewRole::new(role.clone(), "Reader")
            .with_permissions([Permission::try_from("invoice:read").unwrap()]),
    ))
    .unwrap();
    block_on(bindings.assign_role(&tenant, &role, &subject, None, None)).unwrap();

    let checker = Checker::new(Arc::new(StoreResolver::new(store)), checker_cache);
    let context = CheckContext::new(
        TenantContext::active(tenant),
        SubjectContext::new(subject, SubjectKind::User),
        Permission::try_from("invoice:read").unwrap(),
    );
    (checker, context)
}

fn setup_hierarchy(depth: usize) -> (Checker, CheckContext) {
    let store = MemoryStore::new();
    let cache = PermissionCache::new(0);
    let tenant = TenantId::try_from("tenant_hierarchy_bench").unwrap();
    let subject = SubjectId::try_from("subject_hierarchy_bench").unwrap();

    let roles = RoleManager::new(store.clone(), cache.clone());
    let bindings = BindingManager::new(store.clone(), cache.clone());
    for i in (0..=depth).rev() {
        let id = RoleId::try_from(format!("role_chain_{i}").as_str()).unwrap();
        let mut new_role = NewRole::new(id, format!("Chain {i}"));
        if i == depth {
            new_role =
                new_role.with_permissions([Permission::try_from("invoice:read").unwrap()]);
        } else {
            new_role = new_role
                .with_inherits([RoleId::try_from(format!("role_chain_{}", i + 1).as_str())
                    .unwrap()]);
        }
        block_on(roles.create_role(&tenant, new_role)).unwrap();
    }
    let first = RoleId::try_from("role_chain_0").unwrap();
    block_on(bindings.assign_role(&tenant, &first, &subject, None, None)).unwrap();

    let checker = Checker::new(Arc::new(StoreResolver::new(store)), cache);
    let context = CheckContext::new(
        TenantContext::active(tenant),
        SubjectContext::new(subject, SubjectKind::User),
        Permission::try_from("invoice:read").unwrap(),
    );
    (checker, context)
}

fn bench_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_flat");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    let (checker, context) = setup_flat(PermissionCache::new(0));
    group.bench_function("check_no_cache", |b| {
        b.iter(|| {
            let result = block_on(checker.check(&context)).unwrap();
            black_box(result);
        });
    });

    let (checker, context) =
        setup_flat(PermissionCache::new(8_192).with_ttl(Duration::from_secs(60)));
    let warm = block_on(checker.check(&context)).unwrap();
    assert!(warm.allowed);
    group.bench_function("check_hot_cache", |b| {
        b.iter(|| {
            let result = block_on(checker.check(&context)).unwrap();
            black_box(result);
        });
    });

    group.finish();
}

fn bench_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_hierarchy");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    for depth in [2usize, 8, 16] {
        let (checker, context) = setup_hierarchy(depth);
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, _| {
            b.iter(|| {
                let result = block_on(checker.check(&context)).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flat, bench_hierarchy);
criterion_main!(benches);
