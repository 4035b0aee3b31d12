//! The DMP composite system.

use crate::layout::StateLayout;
use crate::variant::{DmpType, ForcingTermScaling};
use dmp_core::{
    DmpError, DmpResult, Real, Trajectory, ensure_finite, ensure_len, ensure_positive,
    ensure_time_sequence,
};
use dmp_dynamics::{DynamicalSystem, SpringDamperSystem, SubSystem};
use dmp_fa::FunctionApproximator;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Damping of the spring-damper; the spring constant follows as `d^2 / 4`.
pub const DAMPING_COEFFICIENT: Real = 20.0;

/// Gating values below this are treated as zero when computing training targets.
const MIN_GATING: Real = 1e-12;

/// Output of [`Dmp::analytical_solution_with_forcing`], one row per time.
#[derive(Clone, Debug, PartialEq)]
pub struct DmpSolution {
    pub xs: DMatrix<Real>,
    pub xds: DMatrix<Real>,
    /// Gated (and scaled) forcing term per dimension.
    pub forcing_terms: DMatrix<Real>,
    /// Raw approximator outputs per dimension.
    pub fa_outputs: DMatrix<Real>,
}

/// Dynamic Movement Primitive.
///
/// Per output dimension the spring-damper follows
///
/// ```text
/// tau * yd = z
/// tau * zd = -k (y - goal) - d z + f,     f = gating * fa(phase) * s
/// ```
///
/// where `s` is given by the [`ForcingTermScaling`]. The phase, gating and
/// goal systems are fixed by the [`DmpType`].
///
/// Both [`DynamicalSystem::analytical_solution`] and
/// [`DynamicalSystem::integrate_step`] advance the phase, gating and goal
/// systems exactly, and the spring-damper exactly under an equilibrium
/// `goal + f / k` interpolated linearly across each step. The two paths
/// therefore agree to floating-point precision at matching times.
#[derive(Clone, Debug)]
pub struct Dmp {
    dmp_type: DmpType,
    scaling: ForcingTermScaling,
    tau: Real,
    y_init: DVector<Real>,
    y_attr: DVector<Real>,
    /// `y_attr - y_init` of the demonstration the approximators were trained on.
    trained_amplitude: Option<DVector<Real>>,
    spring: SpringDamperSystem,
    goal: Option<SubSystem>,
    phase: SubSystem,
    gating: SubSystem,
    fas: Vec<Box<dyn FunctionApproximator>>,
    layout: StateLayout,
    x_init: DVector<Real>,
}

impl Dmp {
    /// Create a DMP with one function approximator per output dimension.
    ///
    /// Untrained approximators contribute no forcing term, so an untrained DMP
    /// is a plain point attractor.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if `tau` is not positive or `fas.len()` differs from `y_init.len()`
    /// - `InvalidState` if `y_init` is empty or `y_attr` has a different length
    pub fn new(
        tau: Real,
        y_init: DVector<Real>,
        y_attr: DVector<Real>,
        fas: Vec<Box<dyn FunctionApproximator>>,
        dmp_type: DmpType,
    ) -> DmpResult<Self> {
        ensure_positive(tau, "tau")?;
        let dim = y_init.len();
        if dim == 0 {
            return Err(DmpError::invalid_state("y_init must not be empty"));
        }
        ensure_len(&y_attr, dim, "y_attr")?;
        for &v in y_init.iter().chain(y_attr.iter()) {
            ensure_finite(v, "DMP boundary state")?;
        }
        if fas.len() != dim {
            return Err(DmpError::invalid_parameter(format!(
                "{} function approximators for {dim} output dimensions",
                fas.len()
            )));
        }

        let systems = dmp_type.subsystems(tau, &y_init, &y_attr)?;
        let spring = SpringDamperSystem::new(tau, y_init.clone(), y_attr.clone(), DAMPING_COEFFICIENT)?;
        let layout = StateLayout::new(dim);

        let mut dmp = Self {
            dmp_type,
            scaling: ForcingTermScaling::default(),
            tau,
            y_init,
            y_attr,
            trained_amplitude: None,
            spring,
            goal: systems.goal,
            phase: systems.phase,
            gating: systems.gating,
            fas,
            layout,
            x_init: DVector::zeros(layout.dim_x()),
        };
        dmp.refresh_x_init();
        Ok(dmp)
    }

    /// Create a DMP that reproduces a demonstration.
    ///
    /// `tau` is the duration of the trajectory, `y_init`/`y_attr` its first and
    /// last positions; the approximators are then trained with [`Dmp::train`].
    pub fn from_traj(
        traj: &Trajectory,
        fas: Vec<Box<dyn FunctionApproximator>>,
        dmp_type: DmpType,
    ) -> DmpResult<Self> {
        let mut dmp = Self::new(traj.duration(), traj.y_init(), traj.y_final(), fas, dmp_type)?;
        dmp.train(traj)?;
        Ok(dmp)
    }

    pub fn with_forcing_term_scaling(mut self, scaling: ForcingTermScaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Fit the approximators to the forcing term that reproduces `traj`.
    ///
    /// Adopts the duration and endpoints of the trajectory first.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` on a dimension mismatch or a zero-length trajectory;
    /// approximator failures surface as `ConvergenceFailure`.
    pub fn train(&mut self, traj: &Trajectory) -> DmpResult<()> {
        if traj.dim() != self.dim() {
            return Err(DmpError::invalid_parameter(format!(
                "trajectory has {} dimensions, DMP has {}",
                traj.dim(),
                self.dim()
            )));
        }
        self.set_tau(traj.duration())?;
        self.set_y_init(&traj.y_init())?;
        self.set_y_attr(&traj.y_final())?;

        let (inputs, targets) = self.compute_targets(traj)?;
        for (d, fa) in self.fas.iter_mut().enumerate() {
            let column = targets.column(d).into_owned();
            debug!(
                dimension = d,
                approximator = fa.name(),
                target_min = column.min(),
                target_max = column.max(),
                "training forcing term"
            );
            fa.train(&inputs, &column)?;
        }
        self.trained_amplitude = Some(&self.y_attr - &self.y_init);
        Ok(())
    }

    /// Approximator inputs (phase, one column) and targets (one column per
    /// dimension) for a demonstration.
    ///
    /// The target is the forcing term needed to follow the demonstration,
    /// `tau^2 ydd + d tau yd + k (y - goal)`, divided by the gating value.
    /// Times are taken relative to the first sample.
    pub fn compute_targets(&self, traj: &Trajectory) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        let dim = self.dim();
        if traj.dim() != dim {
            return Err(DmpError::invalid_parameter(format!(
                "trajectory has {} dimensions, DMP has {dim}",
                traj.dim()
            )));
        }
        let t0 = traj.ts()[0];
        let ts = traj.ts().map(|t| t - t0);
        let n = ts.len();

        let (phases, _) = self.phase.analytical_solution(&ts)?;
        let (gatings, _) = self.gating.analytical_solution(&ts)?;
        let (goals, _) = self.goal_solution(&ts)?;

        let tau = self.tau;
        let k = self.spring.spring_constant();
        let d = self.spring.damping_coefficient();
        let (ys, yds, ydds) = (traj.ys(), traj.yds(), traj.ydds());
        let targets = DMatrix::from_fn(n, dim, |i, j| {
            let f = tau * tau * ydds[(i, j)] + d * tau * yds[(i, j)] + k * (ys[(i, j)] - goals[(i, j)]);
            let gating = gatings[(i, 0)];
            if gating.abs() < MIN_GATING { 0.0 } else { f / gating }
        });
        Ok((phases, targets))
    }

    /// Closed-form solution with the forcing terms used along the way.
    ///
    /// `ts` must be non-negative and non-decreasing; the DMP starts in
    /// `x_init` at `t = 0`.
    pub fn analytical_solution_with_forcing(&self, ts: &DVector<Real>) -> DmpResult<DmpSolution> {
        ensure_time_sequence(ts)?;
        let n = ts.len();
        let dim = self.dim();
        let layout = self.layout;
        if n == 0 {
            return Ok(DmpSolution {
                xs: DMatrix::zeros(0, layout.dim_x()),
                xds: DMatrix::zeros(0, layout.dim_x()),
                forcing_terms: DMatrix::zeros(0, dim),
                fa_outputs: DMatrix::zeros(0, dim),
            });
        }

        // The spring is integrated from t = 0, so make sure that time is sampled
        let offset = usize::from(ts[0] > 0.0);
        let ts_ext = if offset == 1 { ts.clone().insert_row(0, 0.0) } else { ts.clone() };
        let n_ext = ts_ext.len();

        let (phases, phase_ds) = self.phase.analytical_solution(&ts_ext)?;
        let (gatings, gating_ds) = self.gating.analytical_solution(&ts_ext)?;
        let (goals, goal_ds) = self.goal_solution(&ts_ext)?;
        let (forcing, fa_out) =
            self.forcing_terms(&phases.column(0).into_owned(), &gatings.column(0).into_owned())?;

        let k = self.spring.spring_constant();
        let equilibria = &goals + &forcing / k;

        let mut xs = DMatrix::zeros(n_ext, layout.dim_x());
        let mut xds = DMatrix::zeros(n_ext, layout.dim_x());
        let spring = layout.spring();
        let mut spring_x = self.x_init.rows_range(spring.clone()).into_owned();
        for i in 0..n_ext {
            if i > 0 {
                spring_x = self.spring.step_towards(
                    &spring_x,
                    &equilibria.row(i - 1).transpose(),
                    &equilibria.row(i).transpose(),
                    ts_ext[i] - ts_ext[i - 1],
                )?;
            }
            let goal = goals.row(i).transpose();
            let spring_xd = self.spring_derivative(&spring_x, &goal, &forcing.row(i).transpose());

            xs.view_mut((i, spring.start), (1, spring.len())).copy_from(&spring_x.transpose());
            xs.view_mut((i, layout.goal().start), (1, dim)).copy_from(&goals.row(i));
            xs[(i, layout.phase())] = phases[(i, 0)];
            xs[(i, layout.gating())] = gatings[(i, 0)];

            xds.view_mut((i, spring.start), (1, spring.len())).copy_from(&spring_xd.transpose());
            xds.view_mut((i, layout.goal().start), (1, dim)).copy_from(&goal_ds.row(i));
            xds[(i, layout.phase())] = phase_ds[(i, 0)];
            xds[(i, layout.gating())] = gating_ds[(i, 0)];
        }

        Ok(DmpSolution {
            xs: xs.rows(offset, n).into_owned(),
            xds: xds.rows(offset, n).into_owned(),
            forcing_terms: forcing.rows(offset, n).into_owned(),
            fa_outputs: fa_out.rows(offset, n).into_owned(),
        })
    }

    /// Project states onto the output dimensions.
    ///
    /// Positions and velocities come from the `y` block, accelerations from the
    /// `z` block (`ydd = zd / tau`); goal, phase and gating are dropped.
    pub fn states_as_trajectory(
        &self,
        ts: &DVector<Real>,
        xs: &DMatrix<Real>,
        xds: &DMatrix<Real>,
    ) -> DmpResult<Trajectory> {
        let n = ts.len();
        let dim_x = self.layout.dim_x();
        for (name, m) in [("xs", xs), ("xds", xds)] {
            if m.nrows() != n || m.ncols() != dim_x {
                return Err(DmpError::invalid_state(format!(
                    "{name} is {}x{}, expected {n}x{dim_x}",
                    m.nrows(),
                    m.ncols()
                )));
            }
        }
        Trajectory::new(
            ts.clone(),
            xs.columns_range(self.layout.y()).into_owned(),
            xds.columns_range(self.layout.y()).into_owned(),
            xds.columns_range(self.layout.z()) / self.tau,
        )
    }

    pub fn dim(&self) -> usize {
        self.layout.dim()
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn dmp_type(&self) -> DmpType {
        self.dmp_type
    }

    pub fn forcing_term_scaling(&self) -> ForcingTermScaling {
        self.scaling
    }

    pub fn set_forcing_term_scaling(&mut self, scaling: ForcingTermScaling) {
        self.scaling = scaling;
    }

    pub fn y_init(&self) -> &DVector<Real> {
        &self.y_init
    }

    pub fn y_attr(&self) -> &DVector<Real> {
        &self.y_attr
    }

    pub fn function_approximators(&self) -> &[Box<dyn FunctionApproximator>] {
        &self.fas
    }

    /// Move the start of the movement.
    pub fn set_y_init(&mut self, y_init: &DVector<Real>) -> DmpResult<()> {
        ensure_len(y_init, self.dim(), "y_init")?;
        for &v in y_init.iter() {
            ensure_finite(v, "y_init")?;
        }
        self.spring.set_y_init(y_init)?;
        if let Some(goal) = self.goal.as_mut() {
            goal.set_x_init(y_init.clone())?;
        }
        self.y_init = y_init.clone();
        self.refresh_x_init();
        Ok(())
    }

    /// Move the attractor of the movement.
    pub fn set_y_attr(&mut self, y_attr: &DVector<Real>) -> DmpResult<()> {
        ensure_len(y_attr, self.dim(), "y_attr")?;
        for &v in y_attr.iter() {
            ensure_finite(v, "y_attr")?;
        }
        self.spring.set_y_attr(y_attr.clone())?;
        if let Some(goal) = self.goal.as_mut() {
            goal.set_x_attr(y_attr.clone())?;
        }
        self.y_attr = y_attr.clone();
        self.refresh_x_init();
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.fas.iter().all(|fa| fa.is_trained())
    }

    /// Concatenated parameters of all approximators, in dimension order.
    pub fn parameter_vector(&self) -> DmpResult<DVector<Real>> {
        let parts = self
            .fas
            .iter()
            .map(|fa| fa.parameter_vector())
            .collect::<Result<Vec<_>, _>>()?;
        let values: Vec<Real> = parts.iter().flat_map(|p| p.iter().copied()).collect();
        Ok(DVector::from_vec(values))
    }

    pub fn parameter_vector_size(&self) -> usize {
        self.fas.iter().map(|fa| fa.parameter_vector_size()).sum()
    }

    /// Distribute `values` over the approximators, in dimension order.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the length differs from [`Dmp::parameter_vector_size`].
    pub fn set_parameter_vector(&mut self, values: &DVector<Real>) -> DmpResult<()> {
        let expected = self.parameter_vector_size();
        if values.len() != expected {
            return Err(DmpError::invalid_parameter(format!(
                "parameter vector has length {}, expected {expected}",
                values.len()
            )));
        }
        let mut start = 0;
        for fa in self.fas.iter_mut() {
            let len = fa.parameter_vector_size();
            fa.set_parameter_vector(&values.rows(start, len).into_owned())?;
            start += len;
        }
        Ok(())
    }

    fn refresh_x_init(&mut self) {
        let layout = self.layout;
        let mut x = DVector::zeros(layout.dim_x());
        x.rows_range_mut(layout.spring()).copy_from(self.spring.x_init());
        let goal_init = match &self.goal {
            Some(goal) => goal.x_init(),
            None => &self.y_attr,
        };
        x.rows_mut(layout.goal().start, layout.dim()).copy_from(goal_init);
        x[layout.phase()] = self.phase.x_init()[0];
        x[layout.gating()] = self.gating.x_init()[0];
        self.x_init = x;
    }

    /// Goal positions and velocities at `ts`; constant at the attractor without a goal system.
    fn goal_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        match &self.goal {
            Some(goal) => goal.analytical_solution(ts),
            None => {
                let n = ts.len();
                let dim = self.dim();
                Ok((
                    DMatrix::from_fn(n, dim, |_, d| self.y_attr[d]),
                    DMatrix::zeros(n, dim),
                ))
            }
        }
    }

    /// Per-dimension factor applied to the gated approximator output.
    fn scaling_factors(&self) -> DVector<Real> {
        let dim = self.dim();
        match (self.scaling, &self.trained_amplitude) {
            (ForcingTermScaling::GMinusY0, Some(trained)) => DVector::from_fn(dim, |d, _| {
                if trained[d].abs() < 1e-10 {
                    1.0
                } else {
                    (self.y_attr[d] - self.y_init[d]) / trained[d]
                }
            }),
            _ => DVector::from_element(dim, 1.0),
        }
    }

    /// Forcing terms and raw approximator outputs (both n x D) for the given
    /// phase and gating values.
    fn forcing_terms(
        &self,
        phases: &DVector<Real>,
        gatings: &DVector<Real>,
    ) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        let n = phases.len();
        let dim = self.dim();
        let inputs = DMatrix::from_column_slice(n, 1, phases.as_slice());
        let mut fa_out = DMatrix::zeros(n, dim);
        for (d, fa) in self.fas.iter().enumerate() {
            if fa.is_trained() {
                fa_out.set_column(d, &fa.predict(&inputs)?);
            }
        }
        let scale = self.scaling_factors();
        let forcing = DMatrix::from_fn(n, dim, |i, d| gatings[i] * fa_out[(i, d)] * scale[d]);
        Ok((forcing, fa_out))
    }

    /// Rate of change of `[y | z]` for a given goal and forcing term.
    fn spring_derivative(
        &self,
        spring_x: &DVector<Real>,
        goal: &DVector<Real>,
        forcing: &DVector<Real>,
    ) -> DVector<Real> {
        let k = self.spring.spring_constant();
        let d = self.spring.damping_coefficient();
        let (y_block, z_block) = (self.layout.y(), self.layout.z());
        let y = spring_x.rows_range(y_block.clone());
        let z = spring_x.rows_range(z_block.clone());
        let mut xd = DVector::zeros(self.layout.spring().len());
        xd.rows_range_mut(y_block).copy_from(&(z / self.tau));
        let zd = ((goal - y) * k - z * d + forcing) / self.tau;
        xd.rows_range_mut(z_block).copy_from(&zd);
        xd
    }

    fn scalar_state(x: &DVector<Real>, index: usize) -> DVector<Real> {
        DVector::from_element(1, x[index])
    }
}

impl DynamicalSystem for Dmp {
    fn dim_x(&self) -> usize {
        self.layout.dim_x()
    }

    fn dim_y(&self) -> usize {
        self.layout.dim()
    }

    fn tau(&self) -> Real {
        self.tau
    }

    /// Change the duration of the movement; all subsystems follow.
    fn set_tau(&mut self, tau: Real) -> DmpResult<()> {
        ensure_positive(tau, "tau")?;
        self.spring.set_tau(tau)?;
        self.phase.set_tau(tau)?;
        self.gating.set_tau(tau)?;
        if let Some(goal) = self.goal.as_mut() {
            goal.set_tau(tau)?;
        }
        self.tau = tau;
        Ok(())
    }

    fn x_init(&self) -> &DVector<Real> {
        &self.x_init
    }

    fn differential_equation(&self, x: &DVector<Real>) -> DmpResult<DVector<Real>> {
        let layout = self.layout;
        let dim = layout.dim();
        ensure_len(x, layout.dim_x(), "state")?;

        let phase = Self::scalar_state(x, layout.phase());
        let gating = Self::scalar_state(x, layout.gating());
        let goal = x.rows(layout.goal().start, dim).into_owned();
        let goal_xd = match &self.goal {
            Some(system) => system.differential_equation(&goal)?,
            None => DVector::zeros(dim),
        };
        let (forcing, _) = self.forcing_terms(&phase, &gating)?;
        let spring_x = x.rows_range(layout.spring()).into_owned();
        let spring_xd = self.spring_derivative(&spring_x, &goal, &forcing.row(0).transpose());

        let mut xd = DVector::zeros(layout.dim_x());
        xd.rows_range_mut(layout.spring()).copy_from(&spring_xd);
        xd.rows_mut(layout.goal().start, dim).copy_from(&goal_xd);
        xd[layout.phase()] = self.phase.differential_equation(&phase)?[0];
        xd[layout.gating()] = self.gating.differential_equation(&gating)?[0];
        Ok(xd)
    }

    fn analytical_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        let solution = self.analytical_solution_with_forcing(ts)?;
        Ok((solution.xs, solution.xds))
    }

    fn integrate_step(&self, dt: Real, x: &DVector<Real>) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        ensure_positive(dt, "dt")?;
        let layout = self.layout;
        let dim = layout.dim();
        ensure_len(x, layout.dim_x(), "state")?;

        let phase = Self::scalar_state(x, layout.phase());
        let gating = Self::scalar_state(x, layout.gating());
        let goal = x.rows(layout.goal().start, dim).into_owned();
        let (phase_new, _) = self.phase.integrate_step(dt, &phase)?;
        let (gating_new, _) = self.gating.integrate_step(dt, &gating)?;
        let goal_new = match &self.goal {
            Some(system) => system.integrate_step(dt, &goal)?.0,
            None => goal.clone(),
        };

        let (forcing, _) = self.forcing_terms(
            &DVector::from_vec(vec![phase[0], phase_new[0]]),
            &DVector::from_vec(vec![gating[0], gating_new[0]]),
        )?;
        let k = self.spring.spring_constant();
        let eq_start = &goal + forcing.row(0).transpose() / k;
        let eq_end = &goal_new + forcing.row(1).transpose() / k;
        let spring_new = self
            .spring
            .step_towards(&x.rows_range(layout.spring()).into_owned(), &eq_start, &eq_end, dt)?;

        let mut x_new = DVector::zeros(layout.dim_x());
        x_new.rows_range_mut(layout.spring()).copy_from(&spring_new);
        x_new.rows_mut(layout.goal().start, dim).copy_from(&goal_new);
        x_new[layout.phase()] = phase_new[0];
        x_new[layout.gating()] = gating_new[0];
        let xd_new = self.differential_equation(&x_new)?;
        Ok((x_new, xd_new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmp_core::{linspace, max_abs_diff};
    use dmp_fa::{Rbfn, RbfnConfig};

    fn fas(dim: usize) -> Vec<Box<dyn FunctionApproximator>> {
        (0..dim)
            .map(|_| Box::new(Rbfn::default()) as Box<dyn FunctionApproximator>)
            .collect()
    }

    fn demonstration() -> Trajectory {
        let ts = linspace(0.0, 0.5, 51);
        Trajectory::from_min_jerk(
            &ts,
            &DVector::from_vec(vec![0.0, 0.7]),
            &DVector::from_vec(vec![0.4, 0.5]),
        )
        .unwrap()
    }

    #[test]
    fn state_layout_and_initial_state() {
        let dmp = Dmp::new(
            1.0,
            DVector::from_vec(vec![0.1, 0.2]),
            DVector::from_vec(vec![1.0, 2.0]),
            fas(2),
            DmpType::Kulvicius2012Joining,
        )
        .unwrap();
        assert_eq!(dmp.dim_x(), 8);
        assert_eq!(dmp.dim_y(), 2);
        // [y | z | goal | phase | gating]
        let expected = [0.1, 0.2, 0.0, 0.0, 0.1, 0.2, 0.0, 1.0];
        assert_eq!(dmp.x_init().as_slice(), &expected);

        let ijs = Dmp::new(
            1.0,
            DVector::from_vec(vec![0.1, 0.2]),
            DVector::from_vec(vec![1.0, 2.0]),
            fas(2),
            DmpType::Ijspeert2002Movement,
        )
        .unwrap();
        // Without a goal system the goal block sits at the attractor
        assert_eq!(ijs.x_init()[4], 1.0);
        assert_eq!(ijs.x_init()[6], 1.0);
    }

    #[test]
    fn rejects_mismatched_approximator_count() {
        let err = Dmp::new(
            1.0,
            DVector::zeros(2),
            DVector::zeros(2),
            fas(1),
            DmpType::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DmpError::InvalidParameter { .. }));
    }

    #[test]
    fn rejects_invalid_construction() {
        assert!(matches!(
            Dmp::new(0.0, DVector::zeros(1), DVector::zeros(1), fas(1), DmpType::default()),
            Err(DmpError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Dmp::new(1.0, DVector::zeros(1), DVector::zeros(2), fas(1), DmpType::default()),
            Err(DmpError::InvalidState { .. })
        ));
        assert!(matches!(
            Dmp::new(1.0, DVector::zeros(0), DVector::zeros(0), fas(0), DmpType::default()),
            Err(DmpError::InvalidState { .. })
        ));
    }

    #[test]
    fn untrained_dmp_is_a_point_attractor() {
        let dmp = Dmp::new(
            0.5,
            DVector::from_element(1, 0.0),
            DVector::from_element(1, 1.0),
            fas(1),
            DmpType::Ijspeert2002Movement,
        )
        .unwrap();
        assert!(!dmp.is_trained());
        let solution = dmp
            .analytical_solution_with_forcing(&DVector::from_vec(vec![0.0, 5.0]))
            .unwrap();
        assert_eq!(solution.forcing_terms.amax(), 0.0);
        assert!((solution.xs[(1, 0)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn step_and_closed_form_agree_for_every_variant() {
        let traj = demonstration();
        for dmp_type in [
            DmpType::Ijspeert2002Movement,
            DmpType::Kulvicius2012Joining,
            DmpType::Countdown2013,
        ] {
            let dmp = Dmp::from_traj(&traj, fas(2), dmp_type).unwrap();
            let ts = linspace(0.0, 0.6, 61);
            let (xs, _) = dmp.analytical_solution(&ts).unwrap();
            let (mut x, _) = dmp.integrate_start().unwrap();
            assert!((&x - xs.row(0).transpose()).amax() < 1e-12);
            for i in 1..ts.len() {
                let (x_new, _) = dmp.integrate_step(ts[i] - ts[i - 1], &x).unwrap();
                let diff = (&x_new - xs.row(i).transpose()).amax();
                assert!(diff < 1e-9, "{dmp_type} differs by {diff} at step {i}");
                x = x_new;
            }
        }
    }

    #[test]
    fn solution_derivatives_match_differential_equation() {
        let dmp = Dmp::from_traj(&demonstration(), fas(2), DmpType::Ijspeert2002Movement).unwrap();
        let ts = linspace(0.0, 0.5, 11);
        let (xs, xds) = dmp.analytical_solution(&ts).unwrap();
        for i in 0..ts.len() {
            let xd = dmp.differential_equation(&xs.row(i).transpose()).unwrap();
            assert!((xd - xds.row(i).transpose()).amax() < 1e-9);
        }
    }

    #[test]
    fn solution_starting_after_zero_still_starts_from_x_init() {
        let dmp = Dmp::from_traj(&demonstration(), fas(2), DmpType::Kulvicius2012Joining).unwrap();
        let full = linspace(0.0, 0.5, 51);
        let tail = full.rows(10, 41).into_owned();
        let (xs_full, _) = dmp.analytical_solution(&full).unwrap();
        let (xs_tail, _) = dmp.analytical_solution(&tail).unwrap();
        assert_eq!(xs_tail.nrows(), 41);
        // Goal, phase and gating are closed-form in time
        let closed = |xs: &DMatrix<Real>| xs.columns(4, 4).into_owned();
        assert!(max_abs_diff(&closed(&xs_full.rows(10, 41).into_owned()), &closed(&xs_tail)) < 1e-12);
    }

    #[test]
    fn trajectory_projection_drops_bookkeeping() {
        let dmp = Dmp::from_traj(&demonstration(), fas(2), DmpType::Kulvicius2012Joining).unwrap();
        let ts = linspace(0.0, 0.5, 51);
        let (xs, xds) = dmp.analytical_solution(&ts).unwrap();
        let traj = dmp.states_as_trajectory(&ts, &xs, &xds).unwrap();
        assert_eq!(traj.dim(), 2);
        assert_eq!(traj.len(), 51);
        assert_eq!(traj.ys()[(7, 1)], xs[(7, 1)]);
        assert!((traj.ydds()[(7, 0)] - xds[(7, 2)] / 0.5).abs() < 1e-12);

        assert!(matches!(
            dmp.states_as_trajectory(&ts, &xs.columns(0, 4).into_owned(), &xds),
            Err(DmpError::InvalidState { .. })
        ));
    }

    #[test]
    fn parameter_vector_round_trip() {
        let mut dmp = Dmp::from_traj(
            &demonstration(),
            [4, 6]
                .into_iter()
                .map(|n_basis_functions| {
                    let config = RbfnConfig {
                        n_basis_functions,
                        ..RbfnConfig::default()
                    };
                    Box::new(Rbfn::new(config).unwrap()) as Box<dyn FunctionApproximator>
                })
                .collect(),
            DmpType::Kulvicius2012Joining,
        )
        .unwrap();
        assert!(dmp.is_trained());
        assert_eq!(dmp.parameter_vector_size(), 10);

        let mut params = dmp.parameter_vector().unwrap();
        params[5] += 1.0;
        dmp.set_parameter_vector(&params).unwrap();
        assert_eq!(dmp.parameter_vector().unwrap(), params);
        assert!(matches!(
            dmp.set_parameter_vector(&DVector::zeros(9)),
            Err(DmpError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn mutators_keep_subsystems_consistent() {
        let mut dmp = Dmp::from_traj(&demonstration(), fas(2), DmpType::Kulvicius2012Joining).unwrap();
        dmp.set_y_attr(&DVector::from_vec(vec![1.0, 1.0])).unwrap();
        dmp.set_y_init(&DVector::from_vec(vec![0.2, 0.2])).unwrap();
        dmp.set_tau(1.0).unwrap();
        assert_eq!(dmp.tau(), 1.0);
        assert_eq!(dmp.x_init()[4], 0.2);

        let (xs, _) = dmp.analytical_solution(&linspace(0.0, 10.0, 1001)).unwrap();
        assert!((xs[(1000, 0)] - 1.0).abs() < 1e-6);
        assert!((xs[(1000, 4)] - 1.0).abs() < 1e-9);

        assert!(dmp.set_y_attr(&DVector::zeros(3)).is_err());
        assert!(dmp.set_tau(-1.0).is_err());
        assert_eq!(dmp.tau(), 1.0);
    }

    #[test]
    fn amplitude_scaling_follows_new_goal() {
        let traj = demonstration();
        let ts = linspace(0.0, 0.5, 51);
        let plain = Dmp::from_traj(&traj, fas(2), DmpType::Kulvicius2012Joining).unwrap();
        let mut scaled = plain.clone().with_forcing_term_scaling(ForcingTermScaling::GMinusY0);

        // Unchanged endpoints: scaling is the identity
        let a = plain.analytical_solution_with_forcing(&ts).unwrap();
        let b = scaled.analytical_solution_with_forcing(&ts).unwrap();
        assert!(max_abs_diff(&a.forcing_terms, &b.forcing_terms) < 1e-12);

        // Doubling the amplitude of the first dimension doubles its forcing term
        scaled.set_y_attr(&DVector::from_vec(vec![0.8, 0.5])).unwrap();
        let c = scaled.analytical_solution_with_forcing(&ts).unwrap();
        for i in 0..ts.len() {
            assert!((c.forcing_terms[(i, 0)] - 2.0 * a.forcing_terms[(i, 0)]).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_bad_state_and_times() {
        let dmp = Dmp::from_traj(&demonstration(), fas(2), DmpType::Countdown2013).unwrap();
        assert!(matches!(
            dmp.differential_equation(&DVector::zeros(3)),
            Err(DmpError::InvalidState { .. })
        ));
        assert!(matches!(
            dmp.integrate_step(0.0, dmp.x_init()),
            Err(DmpError::InvalidParameter { .. })
        ));
        assert!(matches!(
            dmp.analytical_solution(&DVector::from_vec(vec![0.2, 0.1])),
            Err(DmpError::InvalidParameter { .. })
        ));
    }
}
