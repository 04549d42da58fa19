//! Multi-resolution analysis: periodised Discrete Wavelet Transform
//!
//! ## Features
//! - Orthogonal wavelet families: Haar, Daubechies, Symlet, Coiflet
//! - Circular (periodised) filter bank, so analysis is an orthogonal operator
//!   and synthesis is its exact transpose
//! - Symmetric extension to a multiple of `2^level`, trimmed on reconstruction

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sw_core::{DenoiseError, DenoiseResult, Sample};

/// Wavelet family types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WaveletFamily {
    /// Haar wavelet (same filter as db1)
    Haar,
    /// Daubechies wavelets (db2, db3, db4, db6, db8)
    Daubechies(u8),
    /// Symlet wavelets (sym4, sym8)
    Symlet(u8),
    /// Coiflet wavelets (coif1, coif2)
    Coiflet(u8),
}

impl Default for WaveletFamily {
    fn default() -> Self {
        WaveletFamily::Daubechies(4)
    }
}

impl WaveletFamily {
    /// Every supported family
    pub const SUPPORTED: [WaveletFamily; 10] = [
        WaveletFamily::Haar,
        WaveletFamily::Daubechies(2),
        WaveletFamily::Daubechies(3),
        WaveletFamily::Daubechies(4),
        WaveletFamily::Daubechies(6),
        WaveletFamily::Daubechies(8),
        WaveletFamily::Symlet(4),
        WaveletFamily::Symlet(8),
        WaveletFamily::Coiflet(1),
        WaveletFamily::Coiflet(2),
    ];

    /// Low-pass decomposition filter, or `None` for an unsupported order
    pub fn scaling_filter(self) -> Option<&'static [f64]> {
        let taps: &'static [f64] = match self {
            WaveletFamily::Haar | WaveletFamily::Daubechies(1) => &HAAR,
            WaveletFamily::Daubechies(2) => &DB2,
            WaveletFamily::Daubechies(3) => &DB3,
            WaveletFamily::Daubechies(4) => &DB4,
            WaveletFamily::Daubechies(6) => &DB6,
            WaveletFamily::Daubechies(8) => &DB8,
            WaveletFamily::Symlet(4) => &SYM4,
            WaveletFamily::Symlet(8) => &SYM8,
            WaveletFamily::Coiflet(1) => &COIF1,
            WaveletFamily::Coiflet(2) => &COIF2,
            _ => return None,
        };
        Some(taps)
    }

    /// Number of filter taps
    pub fn filter_len(self) -> Option<usize> {
        self.scaling_filter().map(<[f64]>::len)
    }
}

impl fmt::Display for WaveletFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveletFamily::Haar => write!(f, "haar"),
            WaveletFamily::Daubechies(n) => write!(f, "db{}", n),
            WaveletFamily::Symlet(n) => write!(f, "sym{}", n),
            WaveletFamily::Coiflet(n) => write!(f, "coif{}", n),
        }
    }
}

impl FromStr for WaveletFamily {
    type Err = DenoiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        let unknown = || DenoiseError::InvalidConfig(format!("unknown wavelet family '{}'", s));

        let family = if id == "haar" {
            WaveletFamily::Haar
        } else if let Some(order) = id.strip_prefix("coif") {
            WaveletFamily::Coiflet(order.parse().map_err(|_| unknown())?)
        } else if let Some(order) = id.strip_prefix("sym") {
            WaveletFamily::Symlet(order.parse().map_err(|_| unknown())?)
        } else if let Some(order) = id.strip_prefix("db") {
            match order.parse().map_err(|_| unknown())? {
                1 => WaveletFamily::Haar,
                n => WaveletFamily::Daubechies(n),
            }
        } else {
            return Err(unknown());
        };

        if family.scaling_filter().is_none() {
            return Err(unknown());
        }
        Ok(family)
    }
}

impl TryFrom<String> for WaveletFamily {
    type Error = DenoiseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WaveletFamily> for String {
    fn from(family: WaveletFamily) -> Self {
        family.to_string()
    }
}

/// Wavelet filter pair (decomposition side; synthesis is the transpose)
#[derive(Debug, Clone)]
pub struct WaveletFilter {
    /// Low-pass decomposition filter
    pub lo_d: Vec<f64>,
    /// High-pass decomposition filter (quadrature mirror of `lo_d`)
    pub hi_d: Vec<f64>,
}

impl WaveletFilter {
    pub fn new(family: WaveletFamily) -> DenoiseResult<Self> {
        let lo_d = family.scaling_filter().ok_or_else(|| {
            DenoiseError::InvalidConfig(format!("unsupported wavelet family '{}'", family))
        })?;
        let n = lo_d.len();

        // g[j] = (-1)^j h[L-1-j]
        let hi_d: Vec<f64> = (0..n)
            .map(|j| {
                let h = lo_d[n - 1 - j];
                if j % 2 == 0 { h } else { -h }
            })
            .collect();

        Ok(Self {
            lo_d: lo_d.to_vec(),
            hi_d,
        })
    }

    pub fn len(&self) -> usize {
        self.lo_d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lo_d.is_empty()
    }
}

/// Coefficient bands of a multi-level decomposition
///
/// Band 0 is the coarsest approximation; the remaining bands are details
/// ordered from coarse to fine.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletCoefficients {
    bands: Vec<Vec<f64>>,
    signal_len: usize,
}

impl WaveletCoefficients {
    /// Build from bands; each detail band must be at least as long as the one before it
    pub fn new(bands: Vec<Vec<f64>>, signal_len: usize) -> DenoiseResult<Self> {
        if bands.len() < 2 {
            return Err(DenoiseError::InvalidConfig(
                "wavelet coefficients need an approximation and at least one detail band"
                    .to_string(),
            ));
        }
        if bands[0].len() != bands[1].len()
            || bands[1..].windows(2).any(|w| w[1].len() != 2 * w[0].len())
        {
            return Err(DenoiseError::InvalidConfig(
                "wavelet band lengths do not form a dyadic decomposition".to_string(),
            ));
        }
        Ok(Self { bands, signal_len })
    }

    /// Number of decomposition levels
    pub fn levels(&self) -> usize {
        self.bands.len() - 1
    }

    pub fn approximation(&self) -> &[f64] {
        &self.bands[0]
    }

    /// Detail bands, coarse to fine
    pub fn details(&self) -> &[Vec<f64>] {
        &self.bands[1..]
    }

    /// Finest-scale detail band (first decomposition level)
    pub fn finest_detail(&self) -> &[f64] {
        &self.bands[self.bands.len() - 1]
    }

    /// All bands, approximation first
    pub fn bands(&self) -> &[Vec<f64>] {
        &self.bands
    }

    /// Apply `f` to every coefficient of every band, approximation included
    pub fn map_in_place<F>(&mut self, mut f: F)
    where
        F: FnMut(f64) -> f64,
    {
        for band in &mut self.bands {
            for coeff in band.iter_mut() {
                *coeff = f(*coeff);
            }
        }
    }

    /// Original signal length the reconstruction is trimmed to
    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    /// Energy per band, approximation first
    pub fn energy_per_band(&self) -> Vec<f64> {
        self.bands
            .iter()
            .map(|band| band.iter().map(|x| x * x).sum())
            .collect()
    }
}

/// Discrete Wavelet Transform (periodised)
pub struct Dwt {
    family: WaveletFamily,
    filter: WaveletFilter,
}

impl Dwt {
    pub fn new(family: WaveletFamily) -> DenoiseResult<Self> {
        Ok(Self {
            family,
            filter: WaveletFilter::new(family)?,
        })
    }

    pub fn family(&self) -> WaveletFamily {
        self.family
    }

    /// Deepest useful level for a signal of `len` samples: `floor(log2(len / (L - 1)))`
    pub fn max_level(&self, len: usize) -> usize {
        max_level(len, self.filter.len())
    }

    /// Shortest signal that supports `level`, saturating at `usize::MAX`
    pub fn min_length(&self, level: usize) -> usize {
        let span = (self.filter.len() - 1).max(1);
        if level >= usize::BITS as usize || span.leading_zeros() < level as u32 {
            return usize::MAX;
        }
        span << level
    }

    /// Check that `level` is valid for a signal of `len` samples
    pub fn check_level(&self, len: usize, level: usize) -> DenoiseResult<()> {
        if level == 0 {
            return Err(DenoiseError::InvalidConfig(
                "decomposition level must be positive".to_string(),
            ));
        }
        if level > self.max_level(len) {
            return Err(DenoiseError::InsufficientLength {
                required: self.min_length(level),
                actual: len,
            });
        }
        Ok(())
    }

    /// Multi-level decomposition
    pub fn decompose(&self, signal: &[Sample], level: usize) -> DenoiseResult<WaveletCoefficients> {
        // check_level bounds `level` by max_level, so the shift below cannot overflow
        self.check_level(signal.len(), level)?;

        let mut approx = symmetric_extend(signal, 1 << level);
        let mut bands = Vec::with_capacity(level + 1);

        for _ in 0..level {
            let (a, d) = self.decompose_level(&approx);
            bands.push(d);
            approx = a;
        }
        bands.push(approx);
        bands.reverse();

        log::trace!(
            "DWT {}: {} samples -> {} levels, approximation {} coeffs",
            self.family,
            signal.len(),
            level,
            bands[0].len()
        );

        WaveletCoefficients::new(bands, signal.len())
    }

    /// Reconstruct from decomposition, trimmed to the original length
    pub fn reconstruct(&self, coeffs: &WaveletCoefficients) -> Vec<Sample> {
        let mut approx = coeffs.approximation().to_vec();

        for detail in coeffs.details() {
            approx = self.reconstruct_level(&approx, detail);
        }

        approx.truncate(coeffs.signal_len());
        approx
    }

    /// Single-level circular analysis of an even-length signal
    pub fn decompose_level(&self, signal: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = signal.len();
        let half = n / 2;
        let mut approx = vec![0.0; half];
        let mut detail = vec![0.0; half];

        for k in 0..half {
            let (mut a, mut d) = (0.0, 0.0);
            for (j, (&lo, &hi)) in self.filter.lo_d.iter().zip(&self.filter.hi_d).enumerate() {
                let x = signal[(2 * k + j) % n];
                a += lo * x;
                d += hi * x;
            }
            approx[k] = a;
            detail[k] = d;
        }

        (approx, detail)
    }

    /// Single-level synthesis (transpose of `decompose_level`)
    fn reconstruct_level(&self, approx: &[f64], detail: &[f64]) -> Vec<f64> {
        let n = approx.len() * 2;
        let mut out = vec![0.0; n];

        for (k, (&a, &d)) in approx.iter().zip(detail).enumerate() {
            for (j, (&lo, &hi)) in self.filter.lo_d.iter().zip(&self.filter.hi_d).enumerate() {
                out[(2 * k + j) % n] += lo * a + hi * d;
            }
        }

        out
    }
}

/// `floor(log2(len / (filter_len - 1)))`, 0 when the signal is shorter than `filter_len - 1`
pub fn max_level(len: usize, filter_len: usize) -> usize {
    let span = filter_len.saturating_sub(1).max(1);
    if len < span {
        return 0;
    }
    let ratio = len / span;
    (usize::BITS - 1 - ratio.leading_zeros()) as usize
}

/// Extend `signal` at the end by mirroring (edge sample repeated) up to a multiple of `block`
fn symmetric_extend(signal: &[f64], block: usize) -> Vec<f64> {
    let n = signal.len();
    let target = n.div_ceil(block) * block;
    let mut extended = Vec::with_capacity(target);
    extended.extend_from_slice(signal);

    for i in 0..target - n {
        extended.push(signal[n - 1 - (i % n)]);
    }

    extended
}

// ============ Filter tables (low-pass decomposition) ============

const HAAR: [f64; 2] = [0.7071067811865476, 0.7071067811865476];

const DB2: [f64; 4] = [
    0.4829629131445341, 0.8365163037378079,
    0.2241438680420134, -0.1294095225512604,
];

const DB3: [f64; 6] = [
    0.3326705529500826, 0.8068915093110925,
    0.4598775021184915, -0.1350110200102546,
    -0.0854412738820267, 0.0352262918857095,
];

const DB4: [f64; 8] = [
    0.2303778133088965, 0.7148465705529156,
    0.6308807679298589, -0.0279837694168599,
    -0.1870348117190930, 0.0308413818355607,
    0.0328830116668852, -0.0105974017850690,
];

const DB6: [f64; 12] = [
    0.1115407433501095, 0.4946238903984533,
    0.7511339080210959, 0.3152503517091982,
    -0.2262646939654400, -0.1297668675672625,
    0.0975016055873225, 0.0275228655303053,
    -0.0315820393174862, 0.0005538422011614,
    0.0047772575109455, -0.0010773010853085,
];

const DB8: [f64; 16] = [
    0.0544158422431049, 0.3128715909143031,
    0.6756307362972904, 0.5853546836541907,
    -0.0158291052563816, -0.2840155429615702,
    0.0004724845739124, 0.1287474266204837,
    -0.0173693010018083, -0.0440882539307952,
    0.0139810279173995, 0.0087460940474061,
    -0.0048703529934518, -0.0003917403733770,
    0.0006754494064506, -0.0001174767841248,
];

const SYM4: [f64; 8] = [
    -0.0757657147893407, -0.0296355276459541,
    0.4976186676324578, 0.8037387518052163,
    0.2978577956055422, -0.0992195435769354,
    -0.0126039672622612, 0.0322231006040713,
];

const SYM8: [f64; 16] = [
    -0.0033824159513594, -0.0005421323316355,
    0.0316950878103452, 0.0076074873252848,
    -0.1432942383510542, -0.0612733590679088,
    0.4813596512592012, 0.7771857516997478,
    0.3644418948359564, -0.0519458381078751,
    -0.0272190299168137, 0.0491371796734768,
    0.0038087520140601, -0.0149522583367926,
    -0.0003029205145516, 0.0018899503329007,
];

const COIF1: [f64; 6] = [
    -0.01565572813546454, -0.0727326195128539,
    0.38486484686420286, 0.8525720202122554,
    0.3378976624578092, -0.0727326195128539,
];

const COIF2: [f64; 12] = [
    -0.0007205494453645122, -0.0018232088707029932,
    0.0056114348193944995, 0.023680171946334084,
    -0.0594344186464569, -0.0764885990783064,
    0.41700518442169254, 0.8127236354455423,
    0.3861100668211622, -0.06737255472196302,
    -0.04146493678175915, 0.016387336463522112,
];
