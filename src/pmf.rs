//! Jarzynski-reweighted potential of mean force along a one-dimensional pull.

use crate::errors::*;
use crate::schedule::Schedule;
use crate::trajectory::TrajectoryData;
use crate::GAS_CONSTANT;
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, trace};

/// Upper bound on the number of grid points
pub const MAX_GRID_POINTS: usize = 1 << 28;

/// The evenly spaced reaction-coordinate values the PMF is evaluated on
///
/// Points run from `begin` towards the end of the pull in steps of $\Delta r$; the number of
/// points is $\lfloor |r_{end} - r_{begin}| / \Delta r \rfloor + 1$. When the pull runs backwards
/// (`r_end < r_begin`) the grid walks downwards, so its common difference is $-\Delta r$ rather
/// than $\Delta r$. A grid that only ever steps upwards would hold no points at all for such a
/// pull and the PMF table would be empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    begin: f64,
    step: f64,
    len: usize,
}

impl Grid {
    /// Grid covering `r_begin..=r_end` with spacing `step_size`
    ///
    /// The bounds must be finite, the step size positive, and the grid no longer than
    /// [`MAX_GRID_POINTS`].
    pub fn new(r_begin: f64, r_end: f64, step_size: f64) -> Result<Self> {
        if !(r_begin.is_finite() && r_end.is_finite()) {
            return Err(SmdError::InvalidArgument(format!(
                "grid bounds must be finite (not {} and {})",
                r_begin, r_end
            )));
        }
        if !(step_size.is_finite() && step_size > 0.0) {
            return Err(SmdError::InvalidArgument(format!(
                "step size must be positive (not {})",
                step_size
            )));
        }

        let span = r_end - r_begin;
        let intervals = (span.abs() / step_size).floor();
        if intervals >= MAX_GRID_POINTS as f64 {
            return Err(SmdError::InvalidArgument(format!(
                "{} to {} in steps of {} needs more than {} grid points",
                r_begin, r_end, step_size, MAX_GRID_POINTS
            )));
        }

        let step = if span < 0.0 { -step_size } else { step_size };
        Ok(Self {
            begin: r_begin,
            step,
            len: intervals as usize + 1,
        })
    }

    /// Number of grid points, $R$
    pub fn len(&self) -> usize {
        self.len
    }

    /// A grid always holds at least `r_begin`
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `r_grid[j]`
    pub fn point(&self, j: usize) -> f64 {
        self.begin + j as f64 * self.step
    }

    /// All grid points
    pub fn points(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.len, |j| self.point(j))
    }

    /// Half the bin width; a sample belongs to bin `j` iff it lies strictly closer than this
    pub fn half_width(&self) -> f64 {
        self.step.abs() / 2.0
    }
}

/// Jarzynski-weighted histogram of the samples on a [`Grid`]
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// The grid the histogram was accumulated on
    pub grid: Grid,
    /// `numerator[j]` is $\sum_t Z_t^{-1} \sum_{i : |r_{it} - r_j| < \Delta r/2} e^{-\beta W_{it}}$
    pub numerator: Array1<f64>,
    /// `denominator[j]` is $\sum_t Z_t^{-1} e^{-\beta k (r_j - c_t)^2 / 2}$
    pub denominator: Array1<f64>,
}

/// A Potential of Mean Force
#[derive(Debug, Clone, PartialEq)]
pub struct Pmf {
    /// `r[j]` is the reaction coordinate of grid point `j`
    pub r: Array1<f64>,
    /// `g[j]` is the free energy at `r[j]` in kcal/mol; `+inf` where no sample fell in the bin
    pub g: Array1<f64>,
    /// Number of trajectories the PMF was estimated from
    pub num_traj: usize,
}

impl Pmf {
    /// Number of grid points
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// True if the PMF holds no grid points
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

/// Potential of mean force from steered MD pulls by Jarzynski reweighting.
///
/// Each sample $r_{it}$ of trajectory $i$ at time $t$ is weighted by $e^{-\beta W_{it}}$ normalised
/// over trajectories, and the moving harmonic restraint
/// $\frac{k}{2}(r - c_t)^2$ is divided back out:
///
/// $$G(r_j) = -\frac{1}{\beta} \ln \frac{\sum_t Z_t^{-1} \sum_i \mathbb{1}(|r_{it} - r_j| < \Delta r / 2)\, e^{-\beta W_{it}}}
/// {N \sum_t Z_t^{-1} e^{-\beta k (r_j - c_t)^2 / 2}}, \qquad Z_t = \sum_i e^{-\beta W_{it}}$$
///
/// # References
///
/// 1. Hummer G and Szabo A. Free energy reconstruction from nonequilibrium single-molecule pulling
/// experiments. PNAS 98:3658, 2001 <https://doi.org/10.1073/pnas.071034098>
#[derive(Builder, Debug)]
#[builder(
    pattern = "owned",
    build_fn(validate = "Self::validate", name = "build_inner", private)
)]
pub struct PmfEstimator {
    /// `r[[i, t]]` is the reaction coordinate of trajectory `i` at sample `t`
    r: Array2<f64>,

    /// `centers[t]` is the restraint center at sample `t`
    centers: Array1<f64>,

    /// `work[[i, t]]` is the accumulated work of trajectory `i` at sample `t` (kcal/mol)
    work: Array2<f64>,

    /// Force constant $k$ of the restraint (kcal/mol/Å²)
    force_constant: f64,

    /// First grid point
    r_begin: f64,

    /// Grid end; included when it lies on the grid
    r_end: f64,

    /// Grid spacing and bin width $\Delta r$
    #[builder(default = "0.1")]
    step_size: f64,

    /// Temperature in K
    #[builder(default = "310.0")]
    temperature: f64,
}

impl PmfEstimatorBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let (Some(r), Some(work)) = (&self.r, &self.work) {
            if r.dim() != work.dim() {
                return Err(format!(
                    "r and work must have the same shape (not {:?} and {:?})",
                    r.dim(),
                    work.dim()
                ));
            }
            if r.len_of(Axis(0)) == 0 {
                return Err("at least one trajectory is required".to_string());
            }
            if let Some(centers) = &self.centers {
                if centers.len() != r.len_of(Axis(1)) {
                    return Err(format!(
                        "centers has {} samples but trajectories have {}",
                        centers.len(),
                        r.len_of(Axis(1))
                    ));
                }
            }
        }

        if let Some(step_size) = self.step_size {
            if !(step_size.is_finite() && step_size > 0.0) {
                return Err(format!("step size must be positive (not {})", step_size));
            }
        }

        if let Some(temperature) = self.temperature {
            if !(temperature.is_finite() && temperature > 0.0) {
                return Err(format!("temperature must be positive (not {})", temperature));
            }
        }

        Ok(())
    }

    /// Take samples, centers and work from loaded trajectories
    pub fn trajectories(self, data: TrajectoryData) -> Self {
        let TrajectoryData { r, centers, work } = data;
        self.r(r).centers(centers).work(work)
    }

    /// Take the force constant and grid bounds from a schedule
    pub fn schedule(self, schedule: &Schedule) -> Self {
        self.force_constant(schedule.force_constant)
            .r_begin(schedule.r_begin)
            .r_end(schedule.r_end)
    }

    /// Build the estimator, moving the sample arrays into it
    pub fn build(self) -> Result<PmfEstimator> {
        let estimator = self.build_inner()?;
        estimator.grid()?;
        Ok(estimator)
    }
}

impl PmfEstimator {
    /// Get a new builder for the `PmfEstimator` struct
    pub fn builder() -> PmfEstimatorBuilder {
        PmfEstimatorBuilder::default()
    }

    /// $N$, the number of trajectories
    pub fn num_traj(&self) -> usize {
        self.r.len_of(Axis(0))
    }

    /// Number of samples per trajectory
    pub fn timesteps(&self) -> usize {
        self.r.len_of(Axis(1))
    }

    /// $\beta = 1 / RT$ in mol/kcal
    pub fn beta(&self) -> f64 {
        1.0 / (GAS_CONSTANT * self.temperature)
    }

    /// The grid the PMF is evaluated on
    pub fn grid(&self) -> Result<Grid> {
        Grid::new(self.r_begin, self.r_end, self.step_size)
    }

    /// Accumulate the reweighted histogram without consuming the estimator
    pub fn histogram(&self) -> Result<Histogram> {
        let temperature = self.temperature;
        let exp_work = self.work.mapv(|w| boltzmann(w, temperature));
        self.accumulate(&exp_work)
    }

    /// Compute the PMF. The work array is exponentiated in place.
    pub fn compute_pmf(mut self) -> Result<Pmf> {
        let temperature = self.temperature;
        self.work.mapv_inplace(|w| boltzmann(w, temperature));

        let histogram = self.accumulate(&self.work)?;
        let num_traj = self.num_traj() as f64;

        let g = (&histogram.numerator / &histogram.denominator)
            .mapv(|ratio| -GAS_CONSTANT * temperature * (ratio / num_traj).ln());

        Ok(Pmf {
            r: histogram.grid.points(),
            g,
            num_traj: self.num_traj(),
        })
    }

    fn accumulate(&self, exp_work: &Array2<f64>) -> Result<Histogram> {
        // Z_t, summed over trajectories
        let partition = exp_work.sum_axis(Axis(0));
        let grid = self.grid()?;
        let half_width = grid.half_width();
        debug!(
            "Accumulating {} grid points over {} trajectories of {} samples",
            grid.len(),
            self.num_traj(),
            self.timesteps()
        );

        let mut numerator = Array1::<f64>::zeros(grid.len());
        let mut denominator = Array1::<f64>::zeros(grid.len());

        for j in 0..grid.len() {
            let r_j = grid.point(j);
            for (t, (&z_t, &c_t)) in partition.iter().zip(self.centers.iter()).enumerate() {
                denominator[j] += self.restraint_weight(r_j, c_t) / z_t;

                for (&r_it, &w_it) in self.r.column(t).iter().zip(exp_work.column(t).iter()) {
                    if (r_it - r_j).abs() < half_width {
                        numerator[j] += w_it / z_t;
                    }
                }
            }
            trace!(
                "r = {}: numerator {}, denominator {}",
                r_j,
                numerator[j],
                denominator[j]
            );
        }

        Ok(Histogram {
            grid,
            numerator,
            denominator,
        })
    }

    /// $e^{-\beta k (r - c)^2 / 2}$
    fn restraint_weight(&self, r: f64, center: f64) -> f64 {
        (-self.force_constant / 2.0 * (r - center).powi(2) / GAS_CONSTANT / self.temperature).exp()
    }
}

/// $e^{-W / RT}$
fn boltzmann(work: f64, temperature: f64) -> f64 {
    (-work / GAS_CONSTANT / temperature).exp()
}

#[cfg(test)]
mod tests {
    use crate::*;
    use ndarray::{array, Array1, Array2};

    fn rt(temperature: f64) -> f64 {
        GAS_CONSTANT * temperature
    }

    #[test]
    fn grid_sizes_truncate() {
        assert_eq!(Grid::new(0.0, 2.0, 0.1).unwrap().len(), 21);
        assert_eq!(Grid::new(0.0, 1.95, 0.1).unwrap().len(), 20);
        assert_eq!(
            Grid::new(0.0, 1.0, 0.5).unwrap().points(),
            array![0.0, 0.5, 1.0]
        );
        assert_eq!(Grid::new(3.0, 3.0, 0.1).unwrap().len(), 1);
    }

    #[test]
    fn unbounded_grids_are_rejected() {
        for &(r_begin, r_end) in &[
            (0.0, std::f64::INFINITY),
            (std::f64::NAN, 1.0),
            (0.0, 1e30),
            (-1e308, 1e308),
        ] {
            assert!(
                matches!(
                    Grid::new(r_begin, r_end, 0.1),
                    Err(SmdError::InvalidArgument(_))
                ),
                "{} -> {}",
                r_begin,
                r_end
            );
        }
        assert!(matches!(
            Grid::new(0.0, 1.0, 0.0),
            Err(SmdError::InvalidArgument(_))
        ));

        let result = PmfEstimator::builder()
            .r(array![[0.0]])
            .centers(array![0.0])
            .work(array![[0.0]])
            .force_constant(10.0)
            .r_begin(0.0)
            .r_end(1e30)
            .build();
        assert!(matches!(result, Err(SmdError::InvalidArgument(_))));
    }

    #[test]
    fn reversed_pull_walks_down() {
        let grid = Grid::new(1.0, 0.0, 0.5).unwrap();
        assert_eq!(grid.points(), array![1.0, 0.5, 0.0]);
        assert_eq!(grid.half_width(), 0.25);
    }

    #[test]
    fn build_estimator_defaults() {
        let estimator = PmfEstimator::builder()
            .r(array![[0.0, 1.0]])
            .centers(array![0.0, 1.0])
            .work(array![[0.0, 0.0]])
            .force_constant(10.0)
            .r_begin(0.0)
            .r_end(1.0)
            .build()
            .unwrap();

        assert_eq!(estimator.step_size, 0.1);
        assert_eq!(estimator.temperature, 310.0);
        assert_eq!(estimator.num_traj(), 1);
        assert_eq!(estimator.timesteps(), 2);
        assert!((estimator.beta() * rt(310.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn builder_moves_arrays_into_estimator() {
        let r = Array2::<f64>::zeros((100, 1000));
        let work = Array2::<f64>::zeros((100, 1000));
        let (r_ptr, work_ptr) = (r.as_ptr(), work.as_ptr());

        let estimator = PmfEstimator::builder()
            .r(r)
            .centers(Array1::zeros(1000))
            .work(work)
            .force_constant(10.0)
            .r_begin(0.0)
            .r_end(1.0)
            .build()
            .unwrap();
        assert_eq!(estimator.r.as_ptr(), r_ptr);
        assert_eq!(estimator.work.as_ptr(), work_ptr);
    }

    #[test]
    fn builder_rejects_inconsistent_shapes() {
        let result = PmfEstimator::builder()
            .r(array![[0.0, 1.0]])
            .centers(array![0.0, 1.0, 2.0])
            .work(array![[0.0, 0.0]])
            .force_constant(10.0)
            .r_begin(0.0)
            .r_end(1.0)
            .build();
        assert!(matches!(result, Err(SmdError::Builder(_))));

        let result = PmfEstimator::builder()
            .r(array![[0.0, 1.0]])
            .centers(array![0.0, 1.0])
            .work(array![[0.0, 0.0], [0.0, 0.0]])
            .force_constant(10.0)
            .r_begin(0.0)
            .r_end(1.0)
            .build();
        assert!(matches!(result, Err(SmdError::Builder(_))));
    }

    #[test]
    fn builder_rejects_nonpositive_temperature() {
        let result = PmfEstimator::builder()
            .r(array![[0.0]])
            .centers(array![0.0])
            .work(array![[0.0]])
            .force_constant(10.0)
            .r_begin(0.0)
            .r_end(1.0)
            .temperature(0.0)
            .build();
        assert!(matches!(result, Err(SmdError::Builder(_))));
    }

    #[test]
    fn single_trajectory_closed_form() {
        let k = 4.0;
        let temperature = 300.0;
        let r = array![[0.02, 0.48, 1.01, 0.51]];
        let centers = array![0.0, 0.5, 1.0, 0.5];
        let work = array![[0.0, 0.7, -0.3, 2.0]];
        let partition = work.mapv(|w: f64| (-w / rt(temperature)).exp());

        let estimator = PmfEstimator::builder()
            .r(r.clone())
            .centers(centers.clone())
            .work(work.clone())
            .force_constant(k)
            .r_begin(0.0)
            .r_end(1.0)
            .step_size(0.5)
            .temperature(temperature)
            .build()
            .unwrap();

        // With one trajectory every normalised weight is exactly one.
        let histogram = estimator.histogram().unwrap();
        assert_eq!(histogram.numerator, array![1.0, 2.0, 1.0]);

        let pmf = estimator.compute_pmf().unwrap();
        for (j, &r_j) in pmf.r.iter().enumerate() {
            let count = r.iter().filter(|&&x| (x - r_j).abs() < 0.25).count() as f64;
            let denom: f64 = centers
                .iter()
                .zip(partition.iter())
                .map(|(&c, &z)| (-k / 2.0 * (r_j - c).powi(2) / rt(temperature)).exp() / z)
                .sum();
            let expected = -rt(temperature) * (count / denom).ln();
            assert!(
                (pmf.g[j] - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "G[{}] = {}, expected {}",
                j,
                pmf.g[j],
                expected
            );
        }
    }

    #[test]
    fn midpoint_samples_fall_in_no_bin() {
        let estimator = PmfEstimator::builder()
            .r(array![[0.25, 0.0]])
            .centers(array![0.0, 0.0])
            .work(array![[0.0, 0.0]])
            .force_constant(1.0)
            .r_begin(0.0)
            .r_end(0.5)
            .step_size(0.5)
            .build()
            .unwrap();

        let histogram = estimator.histogram().unwrap();
        assert_eq!(histogram.numerator, array![1.0, 0.0]);
    }

    #[test]
    fn unvisited_bins_are_infinite() {
        let estimator = PmfEstimator::builder()
            .r(array![[0.0, 1.0]])
            .centers(array![0.0, 1.0])
            .work(array![[0.0, 0.0]])
            .force_constant(10.0)
            .r_begin(0.0)
            .r_end(1.0)
            .step_size(0.5)
            .build()
            .unwrap();

        let pmf = estimator.compute_pmf().unwrap();
        assert!(pmf.g[0].is_finite());
        assert_eq!(pmf.g[1], std::f64::INFINITY);
        assert!(pmf.g[2].is_finite());
    }

    #[test]
    fn work_weights_favour_low_work_pulls() {
        let build = |work| {
            PmfEstimator::builder()
                .r(array![[0.0, 0.0], [0.0, 1.0]])
                .centers(array![0.0, 1.0])
                .work(work)
                .force_constant(10.0)
                .r_begin(0.0)
                .r_end(1.0)
                .step_size(1.0)
                .build()
                .unwrap()
        };

        // The second pull reaches r = 1 cheaply, so that bin gains weight relative to the first
        let cheap = build(array![[0.0, 5.0], [0.0, 0.0]]).histogram().unwrap();
        let costly = build(array![[0.0, 0.0], [0.0, 5.0]]).histogram().unwrap();
        assert!(cheap.numerator[1] > costly.numerator[1]);
        assert_eq!(cheap.denominator, costly.denominator);
    }
}
