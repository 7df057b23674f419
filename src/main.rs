use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use timelapse_cam::{
    camera::FoscamCamera,
    config::TimelapseConfig,
    notify::{MailgunNotifier, Notifier},
    video::DailyVideo,
    Task,
};

use crate::cli::args::{Command, MainArgs};

#[macro_use]
extern crate tracing;

mod cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // setup colorful backtraces
    color_backtrace::install();

    let main_args = MainArgs::parse();

    let _guard = init_logging(&main_args.log_dir)?;

    debug!("reading config from {:?}", &main_args.config);
    let config = TimelapseConfig::read_from_path(&main_args.config)
        .context("failed to read config file")?;

    match main_args.command.unwrap_or(Command::Run) {
        Command::Run => run_tasks(config).await,
        Command::Snapshot => {
            let camera = FoscamCamera::new(&config.camera)?;
            let mut task = timelapse_cam::snapshot::create_task(&config.camera, Box::new(camera))
                .await
                .context("failed to initialize snapshot task")?;

            let path = task.capture().await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Video { no_email } => {
            let daily = daily_video(&config, !no_email)?;

            match daily.run_once(chrono::Local::now()).await? {
                Some(notice) => println!("{}", notice.link),
                None => println!("no snapshots in the capture window"),
            }

            Ok(())
        }
        Command::Videos => cli::videos::print_videos(&config.video.output_path).await,
    }
}

fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    let mut targets = Targets::new().with_default(LevelFilter::INFO);

    if let Ok(directives) = std::env::var("RUST_LOG") {
        for directive in directives.split(',') {
            if let Some((target, level)) = directive.split_once('=') {
                targets = targets.with_target(
                    target,
                    level.parse::<LevelFilter>().context("invalid log level")?,
                );
            } else {
                targets = targets.with_default(
                    directive
                        .parse::<LevelFilter>()
                        .context("invalid log level")?,
                );
            }
        }
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::hourly(log_dir, "timelapse-cam"));

    let reg = tracing_subscriber::registry();

    #[cfg(tokio_unstable)]
    let reg = reg.with(console_subscriber::spawn());

    reg
        // writer that outputs to console
        .with(tracing_subscriber::fmt::layer().with_filter(targets))
        // writer that outputs to files
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(
                    Targets::new().with_targets(vec![("timelapse_cam", LevelFilter::DEBUG)]),
                ),
        )
        .init();

    Ok(guard)
}

fn daily_video(config: &TimelapseConfig, send_email: bool) -> anyhow::Result<DailyVideo> {
    let notifier = match (&config.email, send_email) {
        (Some(email), true) => Some(Box::new(
            MailgunNotifier::new(email.clone()).context("failed to initialize mailer")?,
        ) as Box<dyn Notifier>),
        _ => None,
    };

    if notifier.is_none() {
        info!("video notifications are disabled");
    }

    Ok(DailyVideo::new(
        &config.video,
        config.camera.directory.clone(),
        config.server.as_ref().map(|s| s.public_url.clone()),
        notifier,
    ))
}

async fn run_tasks(config: TimelapseConfig) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    ctrlc::set_handler({
        let cancellation_token = cancellation_token.clone();
        move || {
            info!("received interrupt, shutting down");
            cancellation_token.cancel();
        }
    })
    .context("could not set ctrl+c handler")?;

    let mut tasks = Vec::<Box<dyn Task>>::new();

    debug!("initializing snapshot task");
    let camera = FoscamCamera::new(&config.camera).context("failed to initialize camera")?;
    let snapshot_task = timelapse_cam::snapshot::create_task(&config.camera, Box::new(camera))
        .await
        .context("failed to initialize snapshot task")?;
    tasks.push(Box::new(snapshot_task));

    debug!("initializing video task");
    let daily = daily_video(&config, true)?;
    tasks.push(Box::new(timelapse_cam::video::create_task(
        &config.video,
        daily,
    )));

    if let Some(c) = &config.server {
        debug!("initializing server task");
        tasks.push(Box::new(timelapse_cam::server::create_task(
            c,
            config.video.output_path.clone(),
        )));
    }

    let mut join_set = JoinSet::new();

    for task in tasks {
        debug!("starting {} task", task.name());
        join_set.spawn(task.run(cancellation_token.clone()));
    }

    while let Some(res) = join_set.join_next().await {
        // if task panicked, then will be Some(Err)
        // if task terminated w/ error, then will be Some(Ok(Err))
        // need to propagate errors in both cases

        match res {
            Err(err) => {
                cancellation_token.cancel();
                return Err(err).context("task failed");
            }
            Ok(Err(err)) => {
                cancellation_token.cancel();
                return Err(err).context("task terminated with error");
            }
            _ => {
                info!("exited task");
            }
        }
    }

    Ok(())
}
