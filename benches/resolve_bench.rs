//! Benchmarks for definition resolution and invocation

use autowire_di::helpers::{add, array, create, get, string, value};
use autowire_di::{
    ClassBuilder, ClassRegistry, Container, ContainerBuilder, DefinitionArray, Function, Parameter,
    Parameters, Signature, Value,
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct Logger {
    level: String,
}

#[allow(dead_code)]
struct Mailer {
    logger: autowire_di::ObjectRef,
    host: String,
}

fn registry() -> Arc<ClassRegistry> {
    let registry = ClassRegistry::new();
    registry.register(
        ClassBuilder::<Logger>::new("Logger")
            .constructor(vec![Parameter::new("level").default_value("info")], |args| {
                Ok(Logger {
                    level: args.string(0)?,
                })
            })
            .build(),
    );
    registry.register(
        ClassBuilder::<Mailer>::new("Mailer")
            .constructor(
                vec![Parameter::new("logger").class("Logger"), Parameter::new("host")],
                |args| {
                    Ok(Mailer {
                        logger: args.object(0)?,
                        host: args.string(1)?,
                    })
                },
            )
            .build(),
    );
    Arc::new(registry)
}

fn container() -> Container {
    let container = Container::with_registry(registry());
    container.set("host", value("smtp.local")).unwrap();
    container.set("url", string("smtp://{host}:25")).unwrap();
    container.set("alias", get("host")).unwrap();
    container
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    let container = container();
    container.get("host").unwrap();
    group.bench_function("resolved_value", |b| {
        b.iter(|| black_box(container.get("host").unwrap()))
    });

    group.bench_function("string_template", |b| {
        b.iter(|| {
            let container = container.clone();
            container.clear();
            black_box(container.get("url").unwrap())
        })
    });

    group.bench_function("autowired_object_graph", |b| {
        b.iter(|| {
            let container = Container::with_registry(registry());
            container.set("host", value("smtp.local")).unwrap();
            black_box(container.get("Mailer").unwrap())
        })
    });

    group.finish();
}

fn bench_make(c: &mut Criterion) {
    let mut group = c.benchmark_group("make");

    let container = container();
    container.set("Logger", create(None).constructor(vec!["debug".into()])).unwrap();

    group.bench_function("object_fresh", |b| {
        b.iter(|| black_box(container.make("Logger", &Parameters::new()).unwrap()))
    });

    group.bench_function("object_with_override", |b| {
        let overrides = Parameters::new().with("level", "trace");
        b.iter(|| black_box(container.make("Logger", &overrides).unwrap()))
    });

    group.finish();
}

fn bench_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("call");

    let container = container();
    let connect = Function::new(
        Signature::new(
            "connect",
            vec![Parameter::new("host"), Parameter::new("port").default_value(25)],
        ),
        |args| Ok(Value::from(format!("{}:{}", args.string(0)?, args.int(1)?))),
    );

    group.bench_function("guessed_parameters", |b| {
        b.iter(|| black_box(container.call(connect.clone(), &Parameters::new()).unwrap()))
    });

    group.bench_function("explicit_parameters", |b| {
        let parameters = Parameters::new().with(0, "mx.local").with("port", 587);
        b.iter(|| black_box(container.call(connect.clone(), &parameters).unwrap()))
    });

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    group.bench_function("two_sources_with_extension", |b| {
        b.iter(|| {
            let container = ContainerBuilder::new()
                .add_definitions(
                    DefinitionArray::from_definitions([("list", array(vec![1.into(), 2.into()]))])
                        .unwrap(),
                )
                .add_definitions(
                    DefinitionArray::from_definitions([("list", add(vec![3.into()]))]).unwrap(),
                )
                .build()
                .unwrap();
            black_box(container.get("list").unwrap())
        })
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let container = container();
        container.get("url").unwrap();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = container.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = c.get("url").unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_get,
    bench_make,
    bench_call,
    bench_build,
    bench_concurrent,
);

criterion_main!(benches);
