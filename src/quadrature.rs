//! Adaptive quadrature.
//!
//! Global adaptive bisection driven by the 21-point Gauss-Kronrod rule, in the
//! manner of QUADPACK's QAG: the subinterval with the largest error estimate is
//! bisected until the summed error meets `max(abs_tol, rel_tol·|I|)` or the
//! subdivision budget runs out.
//!
//! Every call allocates its own workspace and drops it on return, including
//! early returns on integrand errors, so concurrent calls share nothing.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::convert::Infallible;

use tracing::{trace, warn};

use crate::config::{ConvergencePolicy, QuadratureOptions};
use crate::error::{Result, SolarError};

/// Kronrod abscissae on [-1, 1]; odd entries are the 10-point Gauss nodes.
const XGK: [f64; 11] = [
    0.995657163025808080735527280689003,
    0.973906528517171720077964012084452,
    0.930157491355708226001207180059508,
    0.865063366688984510732096688423493,
    0.780817726586416897063717578345042,
    0.679409568299024406234327365114874,
    0.562757134668604683339000099272694,
    0.433395394129247190799265943165784,
    0.294392862701460198131126603103866,
    0.148874338981631210884826001129720,
    0.000000000000000000000000000000000,
];

const WGK: [f64; 11] = [
    0.011694638867371874278064396062192,
    0.032558162307964727478818972459390,
    0.054755896574351996031381300244580,
    0.075039674810919952767043140916190,
    0.093125454583697605535065465083366,
    0.109387158802297641899210590325805,
    0.123491976262065851077208980222430,
    0.134709217311473325928054001771707,
    0.142775938577060080797094273138717,
    0.147739104901338491374841515972068,
    0.149445554002916905664936468389821,
];

const WG: [f64; 5] = [
    0.066671344308688137593568809893332,
    0.149451349150580593145776339657697,
    0.219086362515982043995534934228163,
    0.269266719309996355091226921569469,
    0.295524224714752870173892994651338,
];

/// Outcome of an adaptive integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrature {
    pub value: f64,
    pub abs_error: f64,
    pub subintervals: usize,
    /// Whether `abs_error` met the requested tolerance.
    pub converged: bool,
}

impl Quadrature {
    /// The estimate, subject to `policy` when the tolerance was missed.
    pub fn value_under(&self, policy: ConvergencePolicy) -> Result<f64> {
        if self.converged {
            return Ok(self.value);
        }
        match policy {
            ConvergencePolicy::BestEffort => {
                warn!(
                    value = self.value,
                    abs_error = self.abs_error,
                    subintervals = self.subintervals,
                    "quadrature missed its tolerance, using best estimate"
                );
                Ok(self.value)
            }
            ConvergencePolicy::Strict => Err(SolarError::NotConverged {
                estimate: self.value,
                abs_error: self.abs_error,
                subintervals: self.subintervals,
            }),
        }
    }
}

/// ∫ₐᵇ f(x) dx with the default options (relative tolerance 1e-2, 10 000
/// subintervals). Non-convergence is not reported.
///
/// ```rust
/// let half = nusolar::integrate(|x| x, 0.0, 1.0);
/// assert!((half - 0.5).abs() < 1e-2);
/// ```
pub fn integrate<F>(f: F, a: f64, b: f64) -> f64
where
    F: FnMut(f64) -> f64,
{
    integrate_with(f, a, b, &QuadratureOptions::default()).value
}

/// ∫ₐᵇ f(x) dx with explicit options.
pub fn integrate_with<F>(mut f: F, a: f64, b: f64, options: &QuadratureOptions) -> Quadrature
where
    F: FnMut(f64) -> f64,
{
    match try_integrate(|x| Ok::<f64, Infallible>(f(x)), a, b, options) {
        Ok(quadrature) => quadrature,
        Err(never) => match never {},
    }
}

/// ∫ₐᵇ f(x) dx for a fallible integrand.
///
/// The first integrand error aborts the integration and is returned as is.
pub fn try_integrate<F, E>(
    mut f: F,
    a: f64,
    b: f64,
    options: &QuadratureOptions,
) -> std::result::Result<Quadrature, E>
where
    F: FnMut(f64) -> std::result::Result<f64, E>,
{
    if a == b {
        return Ok(Quadrature {
            value: 0.0,
            abs_error: 0.0,
            subintervals: 0,
            converged: true,
        });
    }
    if a > b {
        let flipped = try_integrate(f, b, a, options)?;
        return Ok(Quadrature {
            value: -flipped.value,
            ..flipped
        });
    }

    let limit = options.limit.max(1);
    let mut workspace = Workspace::with_limit(limit);

    let first = Segment::evaluate(&mut f, a, b)?;
    let mut total = first.value;
    let mut total_error = first.error;
    workspace.push(first);

    while total_error > options.tolerance(total) && workspace.len() < limit {
        let Some(worst) = workspace.pop() else {
            break;
        };
        let mid = 0.5 * (worst.a + worst.b);
        if !(worst.a < mid && mid < worst.b) {
            // Interval exhausted in floating point
            workspace.push(worst);
            break;
        }

        let left = Segment::evaluate(&mut f, worst.a, mid)?;
        let right = Segment::evaluate(&mut f, mid, worst.b)?;
        total += left.value + right.value - worst.value;
        total_error += left.error + right.error - worst.error;
        workspace.push(left);
        workspace.push(right);
    }

    let (value, abs_error) = workspace.totals();
    let quadrature = Quadrature {
        value,
        abs_error,
        subintervals: workspace.len(),
        converged: abs_error <= options.tolerance(value),
    };
    trace!(a, b, ?quadrature, "integrated");
    Ok(quadrature)
}

/// Subintervals awaiting refinement, worst error first.
struct Workspace {
    heap: BinaryHeap<Segment>,
}

impl Workspace {
    fn with_limit(limit: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(limit.min(256)),
        }
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn push(&mut self, segment: Segment) {
        self.heap.push(segment);
    }

    fn pop(&mut self) -> Option<Segment> {
        self.heap.pop()
    }

    /// Re-summed value and error, free of the running-update drift.
    fn totals(&self) -> (f64, f64) {
        self.heap
            .iter()
            .fold((0.0, 0.0), |(v, e), s| (v + s.value, e + s.error))
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.error.total_cmp(&other.error)
    }
}

impl Segment {
    /// 21-point Gauss-Kronrod estimate on [a, b] with the QUADPACK error estimate.
    fn evaluate<F, E>(f: &mut F, a: f64, b: f64) -> std::result::Result<Self, E>
    where
        F: FnMut(f64) -> std::result::Result<f64, E>,
    {
        let center = 0.5 * (a + b);
        let half = 0.5 * (b - a);
        let abs_half = half.abs();

        let fc = f(center)?;
        let mut res_gauss = 0.0;
        let mut res_kronrod = fc * WGK[10];
        let mut res_abs = res_kronrod.abs();

        let mut fv1 = [0.0; 10];
        let mut fv2 = [0.0; 10];
        for j in 0..10 {
            let dx = half * XGK[j];
            let f1 = f(center - dx)?;
            let f2 = f(center + dx)?;
            fv1[j] = f1;
            fv2[j] = f2;

            let sum = f1 + f2;
            res_kronrod += WGK[j] * sum;
            res_abs += WGK[j] * (f1.abs() + f2.abs());
            if j % 2 == 1 {
                res_gauss += WG[j / 2] * sum;
            }
        }

        let mean = 0.5 * res_kronrod;
        let mut res_asc = WGK[10] * (fc - mean).abs();
        for j in 0..10 {
            res_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
        }

        let value = res_kronrod * half;
        res_abs *= abs_half;
        res_asc *= abs_half;

        let mut error = ((res_kronrod - res_gauss) * half).abs();
        if res_asc != 0.0 && error != 0.0 {
            error = res_asc * (200.0 * error / res_asc).powf(1.5).min(1.0);
        }
        if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
            error = error.max(50.0 * f64::EPSILON * res_abs);
        }

        Ok(Self { a, b, value, error })
    }
}
