use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use iam_auth::{AccessRequest, PolicyContext, PolicyEvaluator, StaticPolicies};
use iam_core::{Condition, Policy, PolicyUrn};
use serde_json::json;

fn policy_set(size: usize) -> Vec<Policy> {
    let mut policies: Vec<Policy> = (0..size)
        .map(|i| {
            Policy::allow()
                .with_id(PolicyUrn::from_name(&format!("p{i}")))
                .subject(format!("urn:iam::user/<{i}[0-9]*>"))
                .action("iam:user:<load|list>")
                .resource("urn:iam::user/<.+>")
        })
        .collect();

    policies.push(
        Policy::deny()
            .with_id(PolicyUrn::from_name("locked"))
            .subject("<.*>")
            .action("<.*>")
            .resource("<.*>")
            .condition("subject.locked", Condition::BooleanCondition { value: true }),
    );

    policies
}

fn request() -> AccessRequest {
    AccessRequest {
        subject: "urn:iam::user/42".into(),
        action: "iam:user:load".into(),
        resource: "urn:iam::user/7".into(),
        context: PolicyContext::from([("subject.locked".to_string(), json!(false))]),
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_evaluate");

    for size in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let policies = policy_set(size);
            let pdp = PolicyEvaluator::new(Arc::new(StaticPolicies::default()));
            let req = request();

            b.iter(|| {
                let decision = pdp.evaluate(&policies, &req);
                black_box(decision.ok());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
