use criterion::{criterion_group, criterion_main, Criterion};
use tandem::nalgebra::DVector;
use tandem::testing::{ackley, drive, rosenbrock};
use tandem::{Catalog, Session};

fn root_finders(c: &mut Criterion) {
    c.bench_function("bisection sqrt2", |b| {
        b.iter(|| {
            let mut session = Session::open(Catalog::builtin());
            session.select("bisection", 1).unwrap();
            session.hparam_set("lower", 1.0).unwrap();
            session.hparam_set("upper", 2.0).unwrap();
            drive(&mut session, |x| x[0] * x[0] - 2.0, 100).unwrap()
        })
    });

    c.bench_function("brent-dekker sqrt2", |b| {
        b.iter(|| {
            let mut session = Session::open(Catalog::builtin());
            session.select("brent-dekker", 1).unwrap();
            session.hparam_set("x_0", 1.0).unwrap();
            session.hparam_set("x_1", 2.0).unwrap();
            drive(&mut session, |x| x[0] * x[0] - 2.0, 100).unwrap()
        })
    });
}

fn minimizers(c: &mut Criterion) {
    c.bench_function("nelder-mead rosenbrock", |b| {
        b.iter(|| {
            let mut session = Session::open(Catalog::builtin());
            session.select("nelder-mead", 2).unwrap();
            session.hparam_set("max_iterations", 150).unwrap();
            session.seed(&DVector::zeros(2)).unwrap();
            drive(&mut session, rosenbrock, 200).unwrap()
        })
    });

    c.bench_function("differential evolution ackley", |b| {
        b.iter(|| {
            let mut session = Session::open(Catalog::builtin());
            session.select("differential evolution", 2).unwrap();
            session.hparam_set("NP", 20).unwrap();
            session.hparam_set("iterations", 100).unwrap();
            session
                .hparam_set("start", vec![1.0, 1.0])
                .unwrap();
            drive(&mut session, ackley, 20 * 101).unwrap()
        })
    });
}

criterion_group!(benches, root_finders, minimizers);
criterion_main!(benches);
