//! Benchmarks for the service registry

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use service_composer::app::{self, types};
use service_composer::config::BootConfig;
use service_composer::logger::{LOGGER, LOGGER_PROVIDER, Logger, LoggerProvider, bind_logger};
use service_composer::prelude::*;
use std::hint::black_box;

const SMALL: ServiceId = ServiceId::symbol("SmallService");
const MISSING: ServiceId = ServiceId::symbol("Missing");
const CONSUMER: ServiceId = ServiceId::symbol("Consumer");

#[allow(dead_code)]
struct SmallService {
    value: i32,
}

impl Service for SmallService {
    fn create(_: &mut Resolved) -> Result<Self> {
        Ok(SmallService { value: 42 })
    }
}

#[allow(dead_code)]
struct Consumer {
    logger: Arc<Logger>,
    small: Arc<SmallService>,
}

impl Service for Consumer {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(SMALL)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(Consumer {
            logger: deps.get(LOGGER)?,
            small: deps.get(SMALL)?,
        })
    }
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("bind_singleton", |b| {
        b.iter(|| {
            let registry = Registry::new();
            registry.bind(binding!(singleton SMALL => SmallService)).unwrap();
            black_box(registry)
        })
    });

    group.bench_function("bind_or_replace", |b| {
        let registry = Registry::new();
        b.iter(|| {
            let outcome = registry
                .bind_or_replace(Registration::new(SMALL, Strategy::constant(1u8)))
                .unwrap();
            black_box(outcome)
        })
    });

    group.bench_function("compose_server", |b| {
        let config = BootConfig {
            is_packaged: Some(false),
            ..BootConfig::default()
        };
        b.iter(|| black_box(app::compose(&config).unwrap()))
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let registry = Registry::new();
    bind_logger(&registry).unwrap();
    registry.bind(binding!(singleton SMALL => SmallService)).unwrap();
    registry.bind(binding!(CONSUMER => Consumer)).unwrap();

    group.bench_function("get_singleton", |b| {
        b.iter(|| black_box(registry.get::<SmallService>(SMALL).unwrap()))
    });

    group.bench_function("contains_check", |b| {
        b.iter(|| black_box(registry.contains(SMALL)))
    });

    group.bench_function("try_get_not_found", |b| {
        b.iter(|| black_box(registry.try_get::<SmallService>(MISSING)))
    });

    group.bench_function("transient_with_contextual_logger", |b| {
        b.iter(|| black_box(registry.get::<Consumer>(CONSUMER).unwrap()))
    });

    let provider = registry
        .get::<LoggerProvider>(LOGGER_PROVIDER)
        .unwrap();
    group.bench_function("provider_tagged_logger", |b| {
        b.iter(|| black_box(provider.get("Bench").unwrap()))
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let registry = Registry::new();
        registry.bind(binding!(singleton SMALL => SmallService)).unwrap();

        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..100 {
                            let _ = registry.get::<SmallService>(SMALL).unwrap();
                        }
                    });
                }
            })
        })
    });

    group.bench_function("booted_application", |b| {
        let config = BootConfig {
            is_packaged: Some(false),
            ..BootConfig::default()
        };
        let app::Composition { registry, .. } = app::bootstrap(&config).unwrap();
        b.iter(|| black_box(registry.resolve(types::APPLICATION).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_concurrent,
);

criterion_main!(benches);
