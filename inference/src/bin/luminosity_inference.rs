//! Luminosity calibration tutorial
//!
//! Simulates a parallax survey of a single class of stars, infers the mean
//! absolute magnitude and its spread with a hierarchical model, and compares
//! the result with a naive inverted-parallax estimate.
//!
//! Usage:
//! ```
//! cargo run --release --bin luminosity_inference -- [OPTIONS]
//! ```
//!
//! See --help for detailed options.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use luminosity_inference::model::HYPER_PARAMETER_NAMES;
use luminosity_inference::{
    fit, naive_luminosity_estimate, CornerPlot, FitSummary, InferenceError, LuminosityData,
    MagnitudeLimitedModel, PosteriorSamples, SamplerConfig, VolumeCompleteModel,
};
use parallax_surveys::{
    plot_survey_statistics, Catalogue, SurveyConfig, SurveyStatistics,
    UniformSpaceSingleLuminosity,
};
use std::path::PathBuf;

/// Command line arguments for the luminosity inference tutorial
#[derive(Parser, Debug)]
#[command(
    name = "luminosity_inference",
    about = "Run luminosity inference tutorial for distance priors",
    long_about = None
)]
struct Args {
    /// Minimum value of distance distribution (pc)
    #[arg(long, alias = "distMin", default_value_t = 1.0)]
    dist_min: f64,

    /// Maximum value of distance distribution (pc)
    #[arg(long, alias = "distMax", default_value_t = 100.0)]
    dist_max: f64,

    /// Number of stars in simulated survey
    #[arg(long, default_value_t = 50)]
    nstars: usize,

    /// Mean true absolute magnitude
    #[arg(long, alias = "muM", default_value_t = 9.0)]
    mu_m: f64,

    /// Standard deviation of the true absolute magnitude distribution
    #[arg(long, alias = "sigmaM", default_value_t = 0.7)]
    sigma_m: f64,

    /// Survey limiting magnitude (default: none)
    #[arg(long)]
    mlim: Option<f64>,

    /// Simulated astrometric catalogue
    #[arg(long, value_enum, default_value_t = Catalogue::Hipparcos)]
    cat: Catalogue,

    /// Make plot of survey statistics
    #[arg(long)]
    surveyplot: bool,

    /// Do not produce any plots (overrides --surveyplot)
    #[arg(long)]
    noplots: bool,

    /// Use model for volume complete survey
    #[arg(long)]
    volumecomplete: bool,

    /// Random number seed for survey simulation
    #[arg(long)]
    surveyseed: Option<u64>,

    /// Random number seed for the MCMC sampler
    #[arg(long, alias = "stanseed")]
    sampler_seed: Option<u64>,

    /// Number of iterations per chain, half of them warmup
    #[arg(long, alias = "staniter", default_value_t = 10_000)]
    iterations: usize,

    /// Thinning of the post-warmup draws
    #[arg(long, alias = "stanthin", default_value_t = 5)]
    thin: usize,

    /// Number of chains
    #[arg(long, default_value_t = 4)]
    chains: usize,

    /// Directory for figures
    #[arg(long, default_value = "plots")]
    output_dir: PathBuf,

    /// Write the posterior draws to this CSV file
    #[arg(long)]
    samples_csv: Option<PathBuf>,

    /// Hide the sampler progress bars
    #[arg(long)]
    no_progress: bool,
}

impl Args {
    fn survey_config(&self) -> SurveyConfig {
        SurveyConfig {
            number_of_stars: self.nstars,
            min_distance: self.dist_min,
            max_distance: self.dist_max,
            mean_absolute_magnitude: self.mu_m,
            stddev_absolute_magnitude: self.sigma_m,
            survey_limit: self.mlim,
            catalogue: self.cat,
        }
    }

    /// The survey figure is only drawn on request, and `--noplots` wins
    fn survey_plot_requested(&self) -> bool {
        self.surveyplot && !self.noplots
    }

    fn corner_plot_requested(&self) -> bool {
        !self.noplots
    }

    fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            iterations: self.iterations,
            warmup: None,
            thin: self.thin,
            chains: self.chains,
            seed: self.sampler_seed,
            show_progress: !self.no_progress,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("### Generating parallax survey ... ###");
    let generator = UniformSpaceSingleLuminosity::new(args.survey_config())
        .context("Invalid survey configuration")?;
    let survey = generator
        .generate_with_seed(args.surveyseed)
        .context("Failed to generate the parallax survey")?;
    println!("### ... Done ###");
    println!();
    println!("{}", SurveyStatistics::from_survey(&survey));

    if args.survey_plot_requested() {
        let path = args.output_dir.join("survey_statistics.png");
        plot_survey_statistics(&survey, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Survey statistics plot written to {}", path.display());
    }

    let data = LuminosityData::from_survey(&survey, args.volumecomplete)
        .context("Survey cannot be used as model input")?;
    let sampler_config = args.sampler_config();
    let (samples, summary) = if args.volumecomplete {
        let model = VolumeCompleteModel::new(data)?;
        fit(&model, sampler_config)
    } else {
        let model = MagnitudeLimitedModel::new(data)?;
        info!(
            "Initial meanAbsMag drawn below the faintest visible absolute magnitude {:.2}",
            model.max_possible_abs_mag()
        );
        fit(&model, sampler_config)
    }
    .context("Sampling failed")?;

    report(&summary);

    match naive_luminosity_estimate(
        survey.observed_parallaxes.view(),
        survey.parallax_errors.view(),
        survey.observed_magnitudes.view(),
    ) {
        Ok(estimate) => println!("{estimate}"),
        Err(InferenceError::TooFewGoodParallaxes { .. }) => {
            println!("Cannot make naive estimate")
        }
        Err(e) => return Err(e).context("Naive estimate failed"),
    }

    if let Some(path) = &args.samples_csv {
        samples
            .write_csv(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Posterior draws written to {}", path.display());
    }

    if args.corner_plot_requested() {
        corner_plot(&args, &samples)?;
    }
    Ok(())
}

fn report(summary: &FitSummary) {
    println!();
    println!("{summary}");
    println!();
}

fn corner_plot(args: &Args, samples: &PosteriorSamples) -> Result<()> {
    let path = args.output_dir.join("luminosity_corner.png");
    CornerPlot::new(HYPER_PARAMETER_NAMES)
        .with_truths(vec![args.mu_m, args.sigma_m])
        .render(samples, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Corner plot written to {}", path.display());
    Ok(())
}
