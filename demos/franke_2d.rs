use ferreus_scatter::{
    create_evaluation_grid, generate_random_points,
    interpolant_config::{InterpolantSettings, RBFKernelType},
    NearestRBFInterpolator, RBFInterpolator, RBFTestFunctions,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Define input observation points in [0, 1]^2
    let dim = 2usize;
    let num_points = 200usize;
    let points = generate_random_points(num_points, dim, Some(42));

    // Define some values at the observation points using Franke's function
    let point_values = RBFTestFunctions::franke_2d(&points);

    // Cubic kernel with a linear polynomial term
    let settings = InterpolantSettings::builder(RBFKernelType::Phs3).build();

    // Setup and solve the global interpolant
    let global = RBFInterpolator::builder(points.clone(), point_values.clone(), settings.clone())
        .build()?;

    // The k-nearest interpolant defers all solves to evaluation time
    let local = NearestRBFInterpolator::builder(points, point_values, settings)
        .neighbourhood_size(30)
        .build()?;

    // Build a 2D grid of target points in [0, 1]^2 to evaluate at
    let n = 50;
    let targets = create_evaluation_grid(&[(0.0, 1.0), (0.0, 1.0)], &[n, n]);
    let truth = RBFTestFunctions::franke_2d(&targets);

    let global_values = global.evaluate(&targets)?;
    let local_values = local.evaluate(&targets)?;

    let max_error = |values: &faer::Mat<f64>| {
        values
            .col(0)
            .iter()
            .zip(truth.col(0).iter())
            .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs()))
    };

    println!(
        "max |error| over a {}x{} grid: global = {:.3e}, k-nearest = {:.3e}",
        n,
        n,
        max_error(&global_values),
        max_error(&local_values),
    );

    // Gradient of the interpolated field along x
    let ddx = global.evaluate_diff(&targets, &[1, 0])?;
    println!(
        "max |df/dx| over the grid: {:.3e}",
        ddx.col(0).iter().fold(0.0f64, |acc, v| acc.max(v.abs())),
    );

    Ok(())
}
