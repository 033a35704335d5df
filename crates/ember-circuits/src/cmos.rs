//! CMOS inverter models.
//!
//! An unbuffered CMOS inverter run in its linear region is a classic
//! overdrive stage. Three renditions of the same transfer curve:
//!
//! - [`CmosInverter`] solves KCL at the output node with Newton–Raphson.
//!   The iteration count is fixed at five and the node voltage is clamped
//!   to the supply after every step, so the cost per sample is constant and
//!   the result always lies inside the rails, whether or not it converged.
//! - [`CmosLut`] caches that curve in a warped table at construction.
//! - [`CmosApprox`] is a sign-dependent closed form built on `omega`.
//!
//! All three map the input, centred on zero, to an output in `[-1, 1]`.

use alloc::vec::Vec;

use ember_core::omega;
use libm::sqrtf;

use crate::model::CircuitModel;

const N_VTC1: f32 = 1.208306917691355;
const N_VTC2: f32 = 0.3139084341943607;
const N_ALPHA1: f32 = 0.020662094888127674;
const N_ALPHA2: f32 = -0.0017181795239085821;

const P_VTC1: f32 = -0.25610349392710086;
const P_VTC2: f32 = 0.27051216771368214;
const P_ALPHA1: f32 = -0.0003577445606469842;
const P_ALPHA2: f32 = -0.0008620153809796321;
const P_ALPHA3: f32 = -0.00016848836814836602;
const P_ALPHA4: f32 = -1.0800821774906936e-5;

/// Gate bias applied to the centred input (V).
pub const CMOS_BIAS: f32 = 3.45;
/// Supply voltage (V).
pub const CMOS_SUPPLY: f32 = 9.0;
/// Newton–Raphson steps per sample.
pub const CMOS_ITERATIONS: usize = 5;

const CHANNEL_MODULATION: f32 = 0.06;

/// Drain current and output conductance of one transistor.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Operating {
    ids: f32,
    gds: f32,
}

const CUTOFF: Operating = Operating { ids: 0.0, gds: 0.0 };

fn nmos(vgs: f32, vds: f32) -> Operating {
    let vt = N_VTC2 * vgs + N_VTC1;
    let alpha = N_ALPHA2 * vgs + N_ALPHA1;
    let overdrive = vgs - vt;

    if overdrive <= 0.0 {
        CUTOFF
    } else if vds <= overdrive {
        Operating {
            ids: alpha * (overdrive - vds * 0.5) * vds,
            gds: alpha * (overdrive - vds),
        }
    } else {
        Operating {
            ids: 0.5 * alpha * overdrive * overdrive,
            gds: 0.0,
        }
    }
}

fn pmos(vgs: f32, vds: f32) -> Operating {
    let alpha = P_ALPHA1 + vgs * (P_ALPHA2 + vgs * (P_ALPHA3 + vgs * P_ALPHA4));
    let vt = P_VTC1 + P_VTC2 * vgs;
    let overdrive = vgs - vt;
    let modulation = 1.0 - CHANNEL_MODULATION * vds;

    if vgs >= vt {
        CUTOFF
    } else if vds >= overdrive {
        Operating {
            ids: -alpha * (overdrive - vds * 0.5) * vds * modulation,
            gds: -alpha
                * (1.5 * CHANNEL_MODULATION * vds * vds
                    - (2.0 * CHANNEL_MODULATION * overdrive + 1.0) * vds
                    + overdrive),
        }
    } else {
        let sq = overdrive * overdrive;
        Operating {
            ids: -0.5 * alpha * sq * modulation,
            gds: 0.5 * alpha * CHANNEL_MODULATION * sq,
        }
    }
}

/// Iterative inverter model.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmosInverter;

impl CmosInverter {
    /// Creates the model.
    pub fn new() -> Self {
        Self
    }

    /// Output node voltage for a centred input, in `[0, CMOS_SUPPLY]`.
    pub fn solve_node(&self, x: f32) -> f32 {
        let vin = x + CMOS_BIAS;
        let mut vout = CMOS_BIAS;

        for _ in 0..CMOS_ITERATIONS {
            let n = nmos(vin, vout);
            let p = pmos(vin - CMOS_SUPPLY, vout - CMOS_SUPPLY);
            let f = n.ids + p.ids;
            let f_prime = n.gds + p.gds;
            vout -= f / (f_prime + f32::MIN_POSITIVE);
            vout = vout.clamp(0.0, CMOS_SUPPLY);
        }
        vout
    }

    /// Normalised transfer `1 - 2·vout / supply`.
    pub fn transfer(&self, x: f32) -> f32 {
        1.0 - 2.0 * self.solve_node(x) / CMOS_SUPPLY
    }
}

impl CircuitModel for CmosInverter {
    type State = ();

    fn initial_state(&self) {}

    #[inline]
    fn step(&self, _state: (), input: f32) -> (f32, ()) {
        (self.transfer(input), ())
    }

    fn dc_operating_point(&self) -> f32 {
        self.transfer(0.0)
    }
}

/// Table covers `[LUT_MIN_INPUT, LUT_MAX_INPUT]`; inputs outside are clamped.
pub const LUT_MIN_INPUT: f32 = -1.8;
/// Upper end of the table.
pub const LUT_MAX_INPUT: f32 = 5.1;
const LUT_NEGATIVE_POINTS: usize = 4096;
const LUT_POSITIVE_POINTS: usize = 8192;

/// [`CmosInverter`] cached in two quadratically warped tables, one per
/// input sign.
///
/// Entry `i` of a side with `n` points holds the curve at
/// `edge·(i/(n-1))²`, which packs samples around zero where the inverter's
/// gain is highest. Lookup inverts the warp with a square root and
/// interpolates linearly.
#[derive(Debug, Clone)]
pub struct CmosLut {
    negative: Vec<f32>,
    positive: Vec<f32>,
}

impl CmosLut {
    /// Builds the tables from the iterative solver.
    pub fn new() -> Self {
        let solver = CmosInverter::new();
        Self {
            negative: warped_table(&solver, LUT_MIN_INPUT, LUT_NEGATIVE_POINTS),
            positive: warped_table(&solver, LUT_MAX_INPUT, LUT_POSITIVE_POINTS),
        }
    }

    /// Interpolated transfer.
    #[inline]
    pub fn transfer(&self, x: f32) -> f32 {
        let (table, edge) = if x < 0.0 {
            (&self.negative, LUT_MIN_INPUT)
        } else {
            (&self.positive, LUT_MAX_INPUT)
        };
        let last = table.len() - 1;
        let position = sqrtf((x / edge).min(1.0)) * last as f32;
        let i = (position as usize).min(last - 1);
        let frac = position - i as f32;
        let y0 = table[i];
        y0 + (table[i + 1] - y0) * frac
    }
}

impl Default for CmosLut {
    fn default() -> Self {
        Self::new()
    }
}

fn warped_table(solver: &CmosInverter, edge: f32, points: usize) -> Vec<f32> {
    let last = (points - 1) as f32;
    (0..points)
        .map(|i| {
            let t = i as f32 / last;
            solver.transfer(edge * t * t)
        })
        .collect()
}

impl CircuitModel for CmosLut {
    type State = ();

    fn initial_state(&self) {}

    #[inline]
    fn step(&self, _state: (), input: f32) -> (f32, ()) {
        (self.transfer(input), ())
    }

    fn dc_operating_point(&self) -> f32 {
        self.transfer(0.0)
    }
}

/// Closed-form inverter approximation.
///
/// `y = s·(1 - 2 / (1 + s·x/s1 + omega(1 + s·x/s2)))` with `s = sign(x)` and
/// separate `(s1, s2)` for each swing. The coefficients are empirical
/// calibration values fitted against the iterative curve.
#[derive(Debug, Clone, Copy)]
pub struct CmosApprox {
    positive: (f32, f32),
    negative: (f32, f32),
}

impl CmosApprox {
    /// Creates the model with its fitted coefficients.
    pub fn new() -> Self {
        Self {
            positive: (0.04, 0.25),
            negative: (0.5, 0.1),
        }
    }

    /// Static transfer.
    #[inline]
    pub fn transfer(&self, x: f32) -> f32 {
        let (s, (s1, s2)) = if x >= 0.0 {
            (1.0, self.positive)
        } else {
            (-1.0, self.negative)
        };
        s * (1.0 - 2.0 / (1.0 + s * x / s1 + omega(1.0 + s * x / s2)))
    }
}

impl Default for CmosApprox {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitModel for CmosApprox {
    type State = ();

    fn initial_state(&self) {}

    #[inline]
    fn step(&self, _state: (), input: f32) -> (f32, ()) {
        (self.transfer(input), ())
    }

    fn dc_operating_point(&self) -> f32 {
        0.0
    }
}
