//! `harvest build` -- the build ledger and provenance queries.

use anyhow::{Context, Result};

use harvest_core::build::{Build, BuildBuilder, BuildVariant};
use harvest_core::catalog::ProjectId;
use harvest_core::filter::BuildFilter;
use harvest_query::ProvenanceResolver;
use harvest_storage::Storage;
use harvest_ui::styles::{render_build_line, render_category, render_muted};

use crate::cli::{BuildArgs, BuildCommands, BuildListArgs, BuildRecordArgs};
use crate::commands::{find_integration, find_platform, find_project};
use crate::context::RuntimeContext;
use crate::output::{
    BUILD_HEADERS, CHANGE_HEADERS, format_build_detail, format_build_row, format_change_row,
    output_json, output_table,
};

pub fn run(ctx: &RuntimeContext, args: &BuildArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let resolver = ProvenanceResolver::new(&store);

    match &args.command {
        BuildCommands::Record(record) => run_record(ctx, &store, record),
        BuildCommands::Show { id } => {
            let build = store.get_build(*id)?;
            if ctx.json {
                output_json(&build)
            } else {
                println!("{}", format_build_detail(&build));
                Ok(())
            }
        }
        BuildCommands::List(list) => run_list(ctx, &store, list),
        BuildCommands::Good { project } => {
            let project_id = project_filter(&store, project.as_deref())?;
            let builds = store.good_builds(project_id).collect::<Result<Vec<_>, _>>()?;
            print_builds(ctx, &builds)
        }
        BuildCommands::LastGood { project } => {
            let project_id = project_filter(&store, project.as_deref())?;
            let build = resolver.last_good_build(project_id)?;
            print_optional_build(ctx, build.as_ref(), "No good build recorded.")
        }
        BuildCommands::PrevGood { id } => {
            let build = store.get_build(*id)?;
            let previous = resolver.prev_good_build(&build)?;
            print_optional_build(ctx, previous.as_ref(), "No earlier good build.")
        }
        BuildCommands::Changes { id } => {
            let build = store.get_build(*id)?;
            let report = resolver
                .build_report(&build)
                .with_context(|| format!("cannot resolve changes of build #{id}"))?;
            if ctx.json {
                return output_json(&report);
            }

            println!("{}", render_build_line(&report.build));
            match &report.previous {
                Some(previous) => println!("{} {}", render_muted("since"), render_build_line(previous)),
                None => println!("{}", render_muted("no previous good build; showing full history")),
            }
            println!();
            println!("{}", render_category("introduced changes"));
            let ordered = report.introduced.sorted_by_timestamp();
            if ordered.is_empty() {
                println!("  none");
            } else {
                let rows: Vec<Vec<String>> = ordered.into_iter().map(format_change_row).collect();
                output_table(CHANGE_HEADERS, &rows);
            }
            Ok(())
        }
    }
}

fn run_record(ctx: &RuntimeContext, store: &dyn Storage, args: &BuildRecordArgs) -> Result<()> {
    let project = find_project(store, &args.project)?;
    let integration = find_integration(store, &args.integration)?;

    let mut builder = BuildBuilder::new(project.id, integration.id, &args.ci_build_id);
    if let Some(platform) = &args.platform {
        builder = builder.platform(find_platform(store, platform)?.id);
    }
    if let Some(status) = args.status {
        builder = builder.status(status);
    }
    if let Some(started) = args.started {
        builder = builder.started(started);
    }
    if let Some(finished) = args.finished {
        builder = builder.finished(finished);
    }
    if let Some(change_id) = args.last_change {
        builder = builder.last_change(change_id);
    }

    let mut record = builder.build();
    // The ledger replaces the payload on update, so keep the stored one
    // unless a variant flag was given.
    record.variant = match args.variant() {
        Some(variant) => variant,
        None => match store.find_build(&record.key) {
            Ok(existing) => existing.variant,
            Err(e) if e.is_not_found() => BuildVariant::Generic,
            Err(e) => return Err(e.into()),
        },
    };

    let build = store.record_build(&record)?;
    if ctx.json {
        output_json(&build)?;
    } else if !ctx.quiet {
        println!("{}", render_build_line(&build));
    }
    Ok(())
}

fn run_list(ctx: &RuntimeContext, store: &dyn Storage, args: &BuildListArgs) -> Result<()> {
    let mut filter = BuildFilter::default();
    if let Some(project) = &args.project {
        filter = filter.project(find_project(store, project)?.id);
    }
    if let Some(integration) = &args.integration {
        filter = filter.integration_type(find_integration(store, integration)?.id);
    }
    if let Some(platform) = &args.platform {
        filter = filter.platform(find_platform(store, platform)?.id);
    }
    if let Some(status) = args.status {
        filter = filter.status(status);
    }
    if let Some(limit) = args.limit {
        filter = filter.limit(limit);
    }

    let builds = store.list_builds(&filter)?;
    print_builds(ctx, &builds)
}

fn project_filter(store: &dyn Storage, name: Option<&str>) -> Result<Option<ProjectId>> {
    name.map(|n| find_project(store, n).map(|p| p.id)).transpose()
}

fn print_builds(ctx: &RuntimeContext, builds: &[Build]) -> Result<()> {
    if ctx.json {
        return output_json(&builds);
    }
    if builds.is_empty() {
        println!("No builds.");
    } else {
        let rows: Vec<Vec<String>> = builds.iter().map(format_build_row).collect();
        output_table(BUILD_HEADERS, &rows);
    }
    Ok(())
}

fn print_optional_build(ctx: &RuntimeContext, build: Option<&Build>, empty: &str) -> Result<()> {
    if ctx.json {
        return output_json(&build);
    }
    match build {
        Some(build) => println!("{}", format_build_detail(build)),
        None => println!("{empty}"),
    }
    Ok(())
}
