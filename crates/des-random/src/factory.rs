//! Scripted construction of random variables.
//!
//! Configuration scripts name a distribution and pass its parameters as
//! strings; [`create`] dispatches to the per-type `create_instance`
//! constructors.  Numeric conversion is permissive C-style prefix parsing
//! ([`des_core::parse`]), so `"7"` and `"7.0 "` both work; *arity* is
//! checked strictly and yields [`RandError::Parse`].

use des_core::parse::atof;

use crate::error::{RandError, RandResult};
use crate::var::{
    DeltaVar, DetVar, ExponentialVar, NormalVar, ParetoVar, PoissonVar, RandomVar, UniformVar,
};

/// Build a variable from a distribution name and parameter strings.
///
/// Recognized names: `delta`, `uniform`, `exponential`, `pareto`, `normal`,
/// `poisson`, `det` (filename).
pub fn create(kind: &str, par: &[String]) -> RandResult<Box<dyn RandomVar>> {
    match kind {
        "delta" => DeltaVar::create_instance(par),
        "uniform" => UniformVar::create_instance(par),
        "exponential" => ExponentialVar::create_instance(par),
        "pareto" => ParetoVar::create_instance(par),
        "normal" => NormalVar::create_instance(par),
        "poisson" => PoissonVar::create_instance(par),
        "det" => DetVar::create_instance(par),
        _ => Err(RandError::UnknownDistribution(kind.to_owned())),
    }
}

fn arity(par: &[String], n: usize, class: &'static str) -> RandResult<()> {
    if par.len() != n {
        return Err(RandError::Parse {
            msg: "wrong number of parameters".to_owned(),
            class,
        });
    }
    Ok(())
}

impl DeltaVar {
    pub fn create_instance(par: &[String]) -> RandResult<Box<dyn RandomVar>> {
        arity(par, 1, "DeltaVar")?;
        Ok(Box::new(DeltaVar::new(atof(&par[0]))))
    }
}

impl UniformVar {
    pub fn create_instance(par: &[String]) -> RandResult<Box<dyn RandomVar>> {
        arity(par, 2, "UniformVar")?;
        Ok(Box::new(UniformVar::new(atof(&par[0]), atof(&par[1]))))
    }
}

impl ExponentialVar {
    pub fn create_instance(par: &[String]) -> RandResult<Box<dyn RandomVar>> {
        arity(par, 1, "ExponentialVar")?;
        Ok(Box::new(ExponentialVar::new(atof(&par[0]))))
    }
}

impl ParetoVar {
    pub fn create_instance(par: &[String]) -> RandResult<Box<dyn RandomVar>> {
        arity(par, 2, "ParetoVar")?;
        Ok(Box::new(ParetoVar::new(atof(&par[0]), atof(&par[1]))))
    }
}

impl NormalVar {
    pub fn create_instance(par: &[String]) -> RandResult<Box<dyn RandomVar>> {
        arity(par, 2, "NormalVar")?;
        Ok(Box::new(NormalVar::new(atof(&par[0]), atof(&par[1]))))
    }
}

impl PoissonVar {
    pub fn create_instance(par: &[String]) -> RandResult<Box<dyn RandomVar>> {
        arity(par, 1, "PoissonVar")?;
        Ok(Box::new(PoissonVar::new(atof(&par[0]))))
    }
}

impl DetVar {
    /// The single parameter is the rand-file path.
    pub fn create_instance(par: &[String]) -> RandResult<Box<dyn RandomVar>> {
        arity(par, 1, "DetVar")?;
        Ok(Box::new(DetVar::from_file(&par[0])?))
    }
}
