use tandem::nalgebra::DVector;
use tandem::{Catalog, Session, Status};

// https://en.wikipedia.org/wiki/Rosenbrock_function
fn rosenbrock(x: &DVector<f64>) -> f64 {
    let (a, b) = (1.0, 100.0);
    (a - x[0]).powi(2) + b * (x[1] - x[0] * x[0]).powi(2)
}

fn main() -> Result<(), tandem::Error> {
    let mut session = Session::open(Catalog::builtin());
    session.select("nelder-mead", 2)?;
    session.hparam_set("max_iterations", 200)?;
    session.seed(&DVector::from_vec(vec![-1.2, 1.0]))?;

    let mut x = DVector::zeros(2);
    let mut evals = 0;
    while session.done()? == Status::Continue {
        session.next(&mut x)?;
        let fx = rosenbrock(&x);
        session.set_value(&x, fx)?;
        evals += 1;
    }

    let (best, best_fx) = session.best().expect("at least one evaluation");
    println!("evaluations = {evals}");
    println!("best x = {:?}", best.as_slice());
    println!("best f = {best_fx}");

    Ok(())
}
