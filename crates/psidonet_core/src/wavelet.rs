//! Multi-level 2D discrete wavelet transform with periodization.
//!
//! Periodization keeps every level exactly half the size of the previous
//! one, so a decomposition of an `n x n` image packs into an `n x n`
//! coefficient array. Only orthogonal families are provided; the inverse
//! transform is the adjoint of the forward one.
//!
//! ## Coefficient layout
//!
//! Details are stored coarsest level first. Inside a level the bands are
//! `(vertical, horizontal, diagonal)`, where vertical is high-pass along
//! axis 0. In the flat array a level with bands of shape `(s_r, s_c)` puts
//! vertical at rows `[s_r, 2 s_r)` x cols `[0, s_c)`, horizontal at rows
//! `[0, s_r)` x cols `[s_c, 2 s_c)` and diagonal in the remaining quadrant;
//! the approximation sits in the top-left corner.

use std::str::FromStr;

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Axis};

use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;
use crate::subband::{Orientation, Subband};

// =============================================================================
// Filter banks
// =============================================================================

const HAAR_DEC_LO: [f64; 2] = [0.7071067811865476, 0.7071067811865476];

const DB2_DEC_LO: [f64; 4] = [
    -0.12940952255092145,
    0.22414386804185735,
    0.836516303737469,
    0.48296291314469025,
];

const DB3_DEC_LO: [f64; 6] = [
    0.035226291882100656,
    -0.08544127388224149,
    -0.13501102001039084,
    0.4598775021193313,
    0.8068915093133388,
    0.3326705529509569,
];

const DB4_DEC_LO: [f64; 8] = [
    -0.010597401784997278,
    0.032883011666982945,
    0.030841381835986965,
    -0.18703481171888114,
    -0.02798376941698385,
    0.6308807679295904,
    0.7148465705525415,
    0.23037781330885523,
];

const SYM4_DEC_LO: [f64; 8] = [
    -0.07576571478927333,
    -0.02963552764599851,
    0.49761866763201545,
    0.8037387518059161,
    0.29785779560527736,
    -0.09921954357684722,
    -0.012603967262037833,
    0.0322231006040427,
];

const COIF1_DEC_LO: [f64; 6] = [
    -0.01565572813546454,
    -0.0727326195128539,
    0.38486484686420286,
    0.8525720202122554,
    0.3378976624578092,
    -0.0727326195128539,
];

/// Names accepted by [`Wavelet::from_name`].
pub const WAVELET_FAMILIES: [&str; 9] = [
    "haar", "db1", "db2", "db3", "db4", "sym2", "sym3", "sym4", "coif1",
];

/// An orthogonal wavelet filter bank.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavelet {
    name: String,
    dec_lo: Vec<f64>,
    dec_hi: Vec<f64>,
}

impl Wavelet {
    pub fn from_name(name: &str) -> Result<Self> {
        let dec_lo: &[f64] = match name {
            "haar" | "db1" => &HAAR_DEC_LO,
            "db2" | "sym2" => &DB2_DEC_LO,
            "db3" | "sym3" => &DB3_DEC_LO,
            "db4" => &DB4_DEC_LO,
            "sym4" => &SYM4_DEC_LO,
            "coif1" => &COIF1_DEC_LO,
            _ => return Err(PsidoError::UnknownWavelet(name.to_string())),
        };
        // Quadrature mirror: hi[k] = (-1)^(k+1) lo[n-1-k]
        let n = dec_lo.len();
        let dec_hi = (0..n)
            .map(|k| {
                let v = dec_lo[n - 1 - k];
                if k % 2 == 0 {
                    -v
                } else {
                    v
                }
            })
            .collect();
        Ok(Self {
            name: name.to_string(),
            dec_lo: dec_lo.to_vec(),
            dec_hi,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter_length(&self) -> usize {
        self.dec_lo.len()
    }

    pub fn dec_lo(&self) -> &[f64] {
        &self.dec_lo
    }

    pub fn dec_hi(&self) -> &[f64] {
        &self.dec_hi
    }

    /// Reconstruction low-pass filter (time-reversed decomposition filter).
    pub fn rec_lo(&self) -> Vec<f64> {
        self.dec_lo.iter().rev().copied().collect()
    }

    pub fn rec_hi(&self) -> Vec<f64> {
        self.dec_hi.iter().rev().copied().collect()
    }

    fn taps<F: PsidoFloat>(&self) -> (Vec<F>, Vec<F>) {
        let cast = |v: &[f64]| v.iter().map(|&x| F::from_f64_c(x)).collect();
        (cast(&self.dec_lo), cast(&self.dec_hi))
    }
}

impl FromStr for Wavelet {
    type Err = PsidoError;

    fn from_str(s: &str) -> Result<Self> {
        Wavelet::from_name(s)
    }
}

// =============================================================================
// Coefficient containers
// =============================================================================

/// The three detail bands of one decomposition level.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailBands<F> {
    pub vertical: Array2<F>,
    pub horizontal: Array2<F>,
    pub diagonal: Array2<F>,
}

impl<F: PsidoFloat> DetailBands<F> {
    pub fn dim(&self) -> (usize, usize) {
        self.vertical.dim()
    }

    /// Band by orientation; `None` for low-pass.
    pub fn band(&self, orientation: Orientation) -> Option<&Array2<F>> {
        match orientation {
            Orientation::Vertical => Some(&self.vertical),
            Orientation::Horizontal => Some(&self.horizontal),
            Orientation::Diagonal => Some(&self.diagonal),
            Orientation::LowPass => None,
        }
    }

    fn zeros(shape: (usize, usize)) -> Self {
        Self {
            vertical: Array2::zeros(shape),
            horizontal: Array2::zeros(shape),
            diagonal: Array2::zeros(shape),
        }
    }
}

/// A multi-level decomposition: coarsest approximation plus details,
/// coarsest level first.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletCoeffs<F> {
    pub approx: Array2<F>,
    pub details: Vec<DetailBands<F>>,
}

impl<F: PsidoFloat> WaveletCoeffs<F> {
    pub fn levels(&self) -> usize {
        self.details.len()
    }

    /// Block of one subband. Level 0 (no decomposition) only has the
    /// approximation, which is returned whatever the orientation.
    pub fn subband(&self, subband: Subband) -> Result<ArrayView2<'_, F>> {
        let levels = self.levels();
        if levels == 0 && subband.level == 0 {
            return Ok(self.approx.view());
        }
        subband.validate(levels)?;
        let bands = &self.details[levels - subband.level];
        Ok(match bands.band(subband.orientation) {
            Some(band) => band.view(),
            None => self.approx.view(),
        })
    }
}

/// Block shapes of a decomposition, independent of its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoeffLayout {
    shape: (usize, usize),
    levels: usize,
}

impl CoeffLayout {
    /// Layout of a `levels`-deep decomposition of an image of `shape`.
    /// Both sides must be divisible by `2^levels`.
    pub fn new(shape: (usize, usize), levels: usize) -> Result<Self> {
        if levels >= usize::BITS as usize {
            return Err(PsidoError::InvalidLevel(format!(
                "decomposition depth {} is out of range",
                levels
            )));
        }
        let factor = 1usize << levels;
        if shape.0 == 0 || shape.1 == 0 || shape.0 % factor != 0 || shape.1 % factor != 0 {
            return Err(PsidoError::InvalidDimension(format!(
                "shape {:?} cannot be decomposed over {} periodized levels (needs multiples of {})",
                shape, levels, factor
            )));
        }
        Ok(Self { shape, levels })
    }

    /// Layout of an existing decomposition.
    pub fn of<F: PsidoFloat>(coeffs: &WaveletCoeffs<F>) -> Self {
        let (rows, cols) = coeffs.approx.dim();
        let factor = 1usize << coeffs.levels();
        Self {
            shape: (rows * factor, cols * factor),
            levels: coeffs.levels(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn approx_shape(&self) -> (usize, usize) {
        (self.shape.0 >> self.levels, self.shape.1 >> self.levels)
    }

    /// Shape of each detail band at `level` (1 = finest).
    pub fn detail_shape(&self, level: usize) -> (usize, usize) {
        (self.shape.0 >> level, self.shape.1 >> level)
    }
}

// =============================================================================
// 1D periodized kernels
// =============================================================================

/// Single-level periodized analysis of one signal of even length.
fn dwt_periodized<F: PsidoFloat>(
    input: &[F],
    lo: &[F],
    hi: &[F],
    approx: &mut [F],
    detail: &mut [F],
) {
    let n = input.len() as isize;
    let offset = lo.len() / 2;
    for (o, (a, d)) in approx.iter_mut().zip(detail.iter_mut()).enumerate() {
        let i = (offset + 2 * o) as isize;
        let mut sum_lo = F::zero();
        let mut sum_hi = F::zero();
        for (j, (&l, &h)) in lo.iter().zip(hi).enumerate() {
            let x = input[(i - j as isize).rem_euclid(n) as usize];
            sum_lo += l * x;
            sum_hi += h * x;
        }
        *a = sum_lo;
        *d = sum_hi;
    }
}

/// Inverse of [`dwt_periodized`] (its adjoint, the bank being orthogonal).
fn idwt_periodized<F: PsidoFloat>(
    approx: &[F],
    detail: &[F],
    lo: &[F],
    hi: &[F],
    output: &mut [F],
) {
    let n = output.len() as isize;
    let offset = lo.len() / 2;
    output.iter_mut().for_each(|v| *v = F::zero());
    for (o, (&a, &d)) in approx.iter().zip(detail).enumerate() {
        let i = (offset + 2 * o) as isize;
        for (j, (&l, &h)) in lo.iter().zip(hi).enumerate() {
            let idx = (i - j as isize).rem_euclid(n) as usize;
            output[idx] += l * a + h * d;
        }
    }
}

/// Apply [`dwt_periodized`] to every lane along `axis`.
fn analyze_axis<F: PsidoFloat>(
    input: ArrayView2<F>,
    axis: Axis,
    lo: &[F],
    hi: &[F],
) -> (Array2<F>, Array2<F>) {
    let mut shape = input.raw_dim();
    shape[axis.index()] /= 2;
    let half = shape[axis.index()];

    let mut low = Array2::zeros(shape.clone());
    let mut high = Array2::zeros(shape);
    let mut lane_buf = Vec::with_capacity(2 * half);
    let mut a = vec![F::zero(); half];
    let mut d = vec![F::zero(); half];

    for ((lane, mut low_lane), mut high_lane) in input
        .lanes(axis)
        .into_iter()
        .zip(low.lanes_mut(axis))
        .zip(high.lanes_mut(axis))
    {
        lane_buf.clear();
        lane_buf.extend(lane.iter().copied());
        dwt_periodized(&lane_buf, lo, hi, &mut a, &mut d);
        low_lane.iter_mut().zip(&a).for_each(|(dst, &v)| *dst = v);
        high_lane.iter_mut().zip(&d).for_each(|(dst, &v)| *dst = v);
    }
    (low, high)
}

/// Apply [`idwt_periodized`] to every lane pair along `axis`.
fn synthesize_axis<F: PsidoFloat>(
    low: ArrayView2<F>,
    high: ArrayView2<F>,
    axis: Axis,
    lo: &[F],
    hi: &[F],
) -> Array2<F> {
    let mut shape = low.raw_dim();
    shape[axis.index()] *= 2;
    let full = shape[axis.index()];

    let mut output = Array2::zeros(shape);
    let mut a = Vec::with_capacity(full / 2);
    let mut d = Vec::with_capacity(full / 2);
    let mut out_buf = vec![F::zero(); full];

    for ((low_lane, high_lane), mut out_lane) in low
        .lanes(axis)
        .into_iter()
        .zip(high.lanes(axis))
        .zip(output.lanes_mut(axis))
    {
        a.clear();
        a.extend(low_lane.iter().copied());
        d.clear();
        d.extend(high_lane.iter().copied());
        idwt_periodized(&a, &d, lo, hi, &mut out_buf);
        out_lane.iter_mut().zip(&out_buf).for_each(|(dst, &v)| *dst = v);
    }
    output
}

// =============================================================================
// 2D transforms
// =============================================================================

/// Single-level 2D analysis: rows axis first, then columns.
fn dwt2<F: PsidoFloat>(image: ArrayView2<F>, lo: &[F], hi: &[F]) -> (Array2<F>, DetailBands<F>) {
    let (low_rows, high_rows) = analyze_axis(image, Axis(0), lo, hi);
    let (approx, horizontal) = analyze_axis(low_rows.view(), Axis(1), lo, hi);
    let (vertical, diagonal) = analyze_axis(high_rows.view(), Axis(1), lo, hi);
    (
        approx,
        DetailBands {
            vertical,
            horizontal,
            diagonal,
        },
    )
}

/// Single-level 2D synthesis, undoing the axes in reverse order.
fn idwt2<F: PsidoFloat>(
    approx: ArrayView2<F>,
    bands: &DetailBands<F>,
    lo: &[F],
    hi: &[F],
) -> Array2<F> {
    let low_rows = synthesize_axis(approx, bands.horizontal.view(), Axis(1), lo, hi);
    let high_rows = synthesize_axis(bands.vertical.view(), bands.diagonal.view(), Axis(1), lo, hi);
    synthesize_axis(low_rows.view(), high_rows.view(), Axis(0), lo, hi)
}

/// Decompose `image` over `levels` periodized levels.
pub fn decompose<F: PsidoFloat>(
    image: ArrayView2<F>,
    wavelet: &Wavelet,
    levels: usize,
) -> Result<WaveletCoeffs<F>> {
    CoeffLayout::new(image.dim(), levels)?;
    let (lo, hi) = wavelet.taps::<F>();

    let mut current = image.to_owned();
    let mut details = Vec::with_capacity(levels);
    for _ in 0..levels {
        let (approx, bands) = dwt2(current.view(), &lo, &hi);
        details.push(bands);
        current = approx;
    }
    details.reverse();

    Ok(WaveletCoeffs {
        approx: current,
        details,
    })
}

/// Rebuild the image from a decomposition.
pub fn reconstruct<F: PsidoFloat>(coeffs: &WaveletCoeffs<F>, wavelet: &Wavelet) -> Result<Array2<F>> {
    let (lo, hi) = wavelet.taps::<F>();
    let mut current = coeffs.approx.clone();
    for (i, bands) in coeffs.details.iter().enumerate() {
        if bands.dim() != current.dim()
            || bands.horizontal.dim() != current.dim()
            || bands.diagonal.dim() != current.dim()
        {
            return Err(PsidoError::InvalidDimension(format!(
                "detail bands {} of shape {:?} do not match approximation {:?}",
                i,
                bands.dim(),
                current.dim()
            )));
        }
        current = idwt2(current.view(), bands, &lo, &hi);
    }
    Ok(current)
}

/// Split a `2 rows x 2 cols` region into its vertical, horizontal and
/// diagonal quadrants.
fn quadrants<F>(
    region: ArrayViewMut2<'_, F>,
    (rows, cols): (usize, usize),
) -> [ArrayViewMut2<'_, F>; 3] {
    let (top, bottom) = region.split_at(Axis(0), rows);
    let (_, horizontal) = top.split_at(Axis(1), cols);
    let (vertical, diagonal) = bottom.split_at(Axis(1), cols);
    [vertical, horizontal, diagonal]
}

/// Pack a decomposition into one flat array (see the module docs).
pub fn coeffs_to_array<F: PsidoFloat>(coeffs: &WaveletCoeffs<F>) -> Array2<F> {
    let layout = CoeffLayout::of(coeffs);
    let mut array = Array2::zeros(layout.shape());
    let (ar, ac) = coeffs.approx.dim();
    array.slice_mut(s![..ar, ..ac]).assign(&coeffs.approx);

    for bands in &coeffs.details {
        let (rows, cols) = bands.dim();
        let region = array.slice_mut(s![..2 * rows, ..2 * cols]);
        let [mut vertical, mut horizontal, mut diagonal] = quadrants(region, (rows, cols));
        vertical.assign(&bands.vertical);
        horizontal.assign(&bands.horizontal);
        diagonal.assign(&bands.diagonal);
    }
    array
}

/// Reinterpret a flat array as the coefficients of `layout`.
pub fn array_to_coeffs<F: PsidoFloat>(
    array: ArrayView2<F>,
    layout: &CoeffLayout,
) -> Result<WaveletCoeffs<F>> {
    if array.dim() != layout.shape() {
        return Err(PsidoError::InvalidDimension(format!(
            "coefficient array has shape {:?}, layout expects {:?}",
            array.dim(),
            layout.shape()
        )));
    }
    let (ar, ac) = layout.approx_shape();
    let approx = array.slice(s![..ar, ..ac]).to_owned();

    let details = (1..=layout.levels())
        .rev()
        .map(|level| {
            let (rows, cols) = layout.detail_shape(level);
            let mut bands = DetailBands::zeros((rows, cols));
            bands
                .vertical
                .assign(&array.slice(s![rows..2 * rows, ..cols]));
            bands
                .horizontal
                .assign(&array.slice(s![..rows, cols..2 * cols]));
            bands
                .diagonal
                .assign(&array.slice(s![rows..2 * rows, cols..2 * cols]));
            bands
        })
        .collect();

    Ok(WaveletCoeffs { approx, details })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SimpleLcg {
        state: u64,
    }

    impl SimpleLcg {
        fn new(seed: u64) -> Self {
            Self { state: seed }
        }

        fn next_f64(&mut self) -> f64 {
            self.state = self
                .state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1);
            ((self.state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        }
    }

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = SimpleLcg::new(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.next_f64())
    }

    fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_filter_banks_are_orthonormal() {
        for name in WAVELET_FAMILIES {
            let w = Wavelet::from_name(name).unwrap();
            let lo = w.dec_lo();
            let hi = w.dec_hi();
            let sum: f64 = lo.iter().sum();
            let energy: f64 = lo.iter().map(|x| x * x).sum();
            let cross: f64 = lo.iter().zip(hi).map(|(a, b)| a * b).sum();
            assert!((sum - std::f64::consts::SQRT_2).abs() < 1e-10, "{name}");
            assert!((energy - 1.0).abs() < 1e-10, "{name}");
            assert!(cross.abs() < 1e-10, "{name}");
            assert!(hi.iter().sum::<f64>().abs() < 1e-10, "{name}");
        }
    }

    #[test]
    fn test_haar_quadrature_mirror() {
        let w = Wavelet::from_name("haar").unwrap();
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert!((w.dec_hi()[0] + r).abs() < 1e-15);
        assert!((w.dec_hi()[1] - r).abs() < 1e-15);
        assert_eq!(w.rec_lo(), w.dec_lo().to_vec());
        assert_eq!(w.rec_hi(), vec![w.dec_hi()[1], w.dec_hi()[0]]);
    }

    #[test]
    fn test_unknown_wavelet() {
        assert!(matches!(
            Wavelet::from_name("bior2.2"),
            Err(PsidoError::UnknownWavelet(_))
        ));
        assert!("db3".parse::<Wavelet>().is_ok());
    }

    #[test]
    fn test_roundtrip_all_families() {
        for name in WAVELET_FAMILIES {
            let w = Wavelet::from_name(name).unwrap();
            for levels in 0..=3 {
                let image = random_matrix(16, 16, 7 + levels as u64);
                let coeffs = decompose(image.view(), &w, levels).unwrap();
                assert_eq!(coeffs.levels(), levels);
                let back = reconstruct(&coeffs, &w).unwrap();
                let diff = max_abs_diff(&image, &back);
                assert!(diff < 1e-9, "{name} at {levels} levels: max diff {diff}");
            }
        }
    }

    #[test]
    fn test_roundtrip_non_square_f32() {
        let w = Wavelet::from_name("db2").unwrap();
        let image = random_matrix(8, 32, 99).mapv(|v| v as f32);
        let coeffs = decompose(image.view(), &w, 2).unwrap();
        assert_eq!(coeffs.approx.dim(), (2, 8));
        let back = reconstruct(&coeffs, &w).unwrap();
        for (a, b) in image.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_energy_preserved() {
        let w = Wavelet::from_name("sym4").unwrap();
        let image = random_matrix(32, 32, 3);
        let packed = coeffs_to_array(&decompose(image.view(), &w, 3).unwrap());
        let e_in: f64 = image.iter().map(|x| x * x).sum();
        let e_out: f64 = packed.iter().map(|x| x * x).sum();
        assert!((e_in - e_out).abs() / e_in < 1e-9);
    }

    #[test]
    fn test_haar_constant_image() {
        let w = Wavelet::from_name("haar").unwrap();
        let image = Array2::<f64>::ones((8, 8));
        let coeffs = decompose(image.view(), &w, 1).unwrap();
        for &v in coeffs.approx.iter() {
            assert!((v - 2.0).abs() < 1e-12);
        }
        let d = &coeffs.details[0];
        for band in [&d.vertical, &d.horizontal, &d.diagonal] {
            assert!(band.iter().all(|v| v.abs() < 1e-12));
        }
    }

    #[test]
    fn test_vertical_band_is_high_pass_along_rows() {
        // Rows alternate +1/-1: only variation along axis 0.
        let w = Wavelet::from_name("haar").unwrap();
        let image: Array2<f64> = Array2::from_shape_fn((8, 8), |(r, _)| if r % 2 == 0 { 1.0 } else { -1.0 });
        let coeffs = decompose(image.view(), &w, 1).unwrap();
        let d = &coeffs.details[0];
        assert!(d.vertical.iter().all(|v| v.abs() > 1.0));
        assert!(d.horizontal.iter().all(|v| v.abs() < 1e-12));
        assert!(d.diagonal.iter().all(|v| v.abs() < 1e-12));
        assert!(coeffs.approx.iter().all(|v| v.abs() < 1e-12));
    }

    fn assert_matrix_close(actual: &Array2<f64>, expected: &[&[f64]], tol: f64) {
        assert_eq!(actual.nrows(), expected.len());
        for (r, row) in expected.iter().enumerate() {
            assert_eq!(actual.ncols(), row.len());
            for (c, &e) in row.iter().enumerate() {
                assert!(
                    (actual[[r, c]] - e).abs() < tol,
                    "[{r}, {c}]: {} vs {e}",
                    actual[[r, c]]
                );
            }
        }
    }

    #[test]
    fn test_haar_matches_pywt_dwt2() {
        // pywt.dwt2([[1, 2], [3, 4]], 'haar', mode='periodization')
        // -> (5, (-2, -1, 0)) as (cA, (cH, cV, cD)).
        let w = Wavelet::from_name("haar").unwrap();
        let image: Array2<f64> = ndarray::array![[1.0, 2.0], [3.0, 4.0]];
        let coeffs = decompose(image.view(), &w, 1).unwrap();
        let d = &coeffs.details[0];
        assert!((coeffs.approx[[0, 0]] - 5.0).abs() < 1e-12);
        assert!((d.vertical[[0, 0]] + 2.0).abs() < 1e-12);
        assert!((d.horizontal[[0, 0]] + 1.0).abs() < 1e-12);
        assert!(d.diagonal[[0, 0]].abs() < 1e-12);
    }

    #[test]
    fn test_db2_matches_pywt_dwt2_periodization() {
        // pywt.dwt2(image, 'db2', mode='periodization') on a 6x4 image.
        // Band order (cH, cV, cD) maps to (vertical, horizontal, diagonal).
        let w = Wavelet::from_name("db2").unwrap();
        let image = ndarray::array![
            [1.0, 0.0, 2.0, 0.0],
            [0.0, 3.0, 0.0, -1.0],
            [0.0, 0.0, 0.0, 5.0],
            [4.0, 0.0, 1.0, 0.0],
            [2.0, -2.0, 0.0, 1.0],
            [0.0, 1.0, 3.0, 0.0],
        ];
        let coeffs = decompose(image.view(), &w, 1).unwrap();
        let d = &coeffs.details[0];
        let tol = 1e-12;

        assert_matrix_close(
            &coeffs.approx,
            &[
                &[0.1339745962165872, 2.866025403784113],
                &[2.6115381056760967, 1.7299682452687237],
                &[2.8705127018918466, -0.2120190528373665],
            ],
            tol,
        );
        assert_matrix_close(
            &d.vertical,
            &[
                &[-1.1160254037859318, -0.24999999999824873],
                &[1.3002404735790765, 0.3403039830434137],
                &[-1.2153039830398753, 1.940784930201565],
            ],
            tol,
        );
        assert_matrix_close(
            &d.horizontal,
            &[
                &[-0.6160254037858056, -1.9820508075660346],
                &[0.7153039830427115, 2.407291281147788],
                &[-2.5322912811482965, -0.9922277716903641],
            ],
            tol,
        );
        assert_matrix_close(
            &d.diagonal,
            &[
                &[2.8660254037814394, -2.7320508075677195],
                &[-0.26346189432218436, -2.6450317547291458],
                &[0.7455127018908357, 0.029006350946774617],
            ],
            tol,
        );
    }

    #[test]
    fn test_array_layout_roundtrip() {
        let w = Wavelet::from_name("db2").unwrap();
        let image = random_matrix(16, 16, 11);
        let coeffs = decompose(image.view(), &w, 2).unwrap();
        let packed = coeffs_to_array(&coeffs);
        assert_eq!(packed.dim(), (16, 16));

        // Quadrant placement of the finest level.
        assert_eq!(packed.slice(s![8.., ..8]), coeffs.details[1].vertical);
        assert_eq!(packed.slice(s![..8, 8..]), coeffs.details[1].horizontal);
        assert_eq!(packed.slice(s![8.., 8..]), coeffs.details[1].diagonal);
        assert_eq!(packed.slice(s![..4, ..4]), coeffs.approx);

        let layout = CoeffLayout::of(&coeffs);
        assert_eq!(layout, CoeffLayout::new((16, 16), 2).unwrap());
        let unpacked = array_to_coeffs(packed.view(), &layout).unwrap();
        assert_eq!(unpacked, coeffs);
    }

    #[test]
    fn test_subband_accessor() {
        let w = Wavelet::from_name("haar").unwrap();
        let image = random_matrix(16, 16, 5);
        let coeffs = decompose(image.view(), &w, 2).unwrap();
        let v1 = coeffs
            .subband(Subband::new(1, Orientation::Vertical))
            .unwrap();
        assert_eq!(v1, coeffs.details[1].vertical.view());
        let l2 = coeffs.subband(Subband::new(2, Orientation::LowPass)).unwrap();
        assert_eq!(l2, coeffs.approx.view());
        assert!(coeffs
            .subband(Subband::new(1, Orientation::LowPass))
            .is_err());

        let flat = decompose(image.view(), &w, 0).unwrap();
        assert_eq!(
            flat.subband(Subband::new(0, Orientation::LowPass)).unwrap(),
            image.view()
        );
    }

    #[test]
    fn test_invalid_shapes() {
        let w = Wavelet::from_name("haar").unwrap();
        let image = Array2::<f64>::zeros((12, 12));
        assert!(matches!(
            decompose(image.view(), &w, 3),
            Err(PsidoError::InvalidDimension(_))
        ));
        let layout = CoeffLayout::new((16, 16), 2).unwrap();
        assert!(array_to_coeffs(image.view(), &layout).is_err());

        let mut coeffs = decompose(Array2::<f64>::zeros((8, 8)).view(), &w, 2).unwrap();
        coeffs.details[0].vertical = Array2::zeros((3, 3));
        assert!(matches!(
            reconstruct(&coeffs, &w),
            Err(PsidoError::InvalidDimension(_))
        ));
    }
}
