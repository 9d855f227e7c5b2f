use tandem::nalgebra::DVector;
use tandem::{Catalog, Session, Status};

fn main() -> Result<(), tandem::Error> {
    let mut session = Session::open(Catalog::builtin());

    // Any root finder taking x_0/x_1 works here; try swapping the name for
    // "secant" without touching the loop below.
    session.select("brent-dekker", 1)?;
    session.hparam_set("x_0", 2.0)?;
    session.hparam_set("x_1", 3.0)?;

    let mut x = DVector::zeros(1);
    while session.done()? == Status::Continue {
        session.next(&mut x)?;
        let fx = x[0].powi(3) - 2.0 * x[0] - 5.0;
        println!("f({}) = {fx}", x[0]);
        session.set_value(&x, fx)?;
    }

    let root = session.result("root")?.as_float()?;
    println!("root = {root}");

    Ok(())
}
