//! Abstract interpretation of a list traversal `while (x != null) x = x.next`.
//!
//! Run with:
//! ```bash
//! cargo run --example list_traversal -- 4 --coerce-after-focus
//! ```

use clap::Parser;

use shape_rs::context::{AnalysisContext, Config};
use shape_rs::eval::Assign;
use shape_rs::formula::{Formula, Var};
use shape_rs::kleene::Kleene;
use shape_rs::predicate::{PredicateId, Properties, Vocabulary};
use shape_rs::structure::Structure;
use shape_rs::types::Node;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Length of the initial concrete list.
    #[arg(value_name = "INT", default_value = "4")]
    len: usize,

    /// Maximum number of analysis steps.
    #[clap(long, value_name = "INT", default_value = "100")]
    max_steps: usize,

    /// Coerce between the focus formulas of a step.
    #[clap(long)]
    coerce_after_focus: bool,

    /// Two-valued canonical names (unknown counts as false).
    #[clap(long)]
    two_way: bool,

    /// Log engine internals at debug level.
    #[clap(long)]
    debug: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    let level = if args.debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();
    println!("args = {:?}", args);

    let mut vocab = Vocabulary::new();
    let x = vocab.add(
        "x",
        1,
        Properties {
            abstraction: true,
            unique: true,
            ..Default::default()
        },
    )?;
    let n = vocab.add(
        "n",
        2,
        Properties {
            function: true,
            acyclic: true,
            ..Default::default()
        },
    )?;
    let config = Config {
        three_way_canonic: !args.two_way,
        coerce_after_focus: args.coerce_after_focus,
        ..Default::default()
    };
    let ctx = AnalysisContext::with_config(vocab, config)?;
    println!("Constraints:");
    for c in ctx.constraints() {
        println!("  {}", c.display(ctx.vocabulary()));
    }

    // x -> 0 -> 1 -> ... -> len-1
    let mut initial = ctx.new_structure();
    let nodes: Vec<Node> = (0..args.len).map(|_| initial.new_node()).collect();
    if let Some(&head) = nodes.first() {
        initial.update(x, &[head], Kleene::True);
    }
    for w in nodes.windows(2) {
        initial.update(n, &[w[0], w[1]], Kleene::True);
    }
    let mut start = vec![initial];
    let rejected = ctx.coerce_initial(&mut start);
    if rejected > 0 {
        println!("Rejected {} initial structure(s)", rejected);
    }
    ctx.blur_all(&mut start);

    let v = Var::new("v");
    let w = Var::new("w");
    let successor = Formula::and(Formula::atom(x, [v.clone()]), Formula::atom(n, [v.clone(), w.clone()]));
    let focus = [ctx.focus_formula(&Formula::atom(x, [v.clone()]))?, ctx.focus_formula(&successor)?];
    let next = Formula::exists(v, successor);
    let not_null = Formula::atom(x, [Var::new("u")]);

    let mut reached: Vec<Structure> = start.clone();
    let mut work = start;
    let mut steps = 0;
    while let Some(s) = work.pop() {
        if steps == args.max_steps {
            println!("Stopped after {} steps", steps);
            break;
        }
        steps += 1;

        let mut out = ctx.focus_all(&s, &focus, Some(&not_null))?;
        for t in out.iter_mut() {
            step(t, x, &next, &w);
        }
        ctx.coerce_all(&mut out);
        ctx.blur_all(&mut out);

        for t in out {
            if !reached.iter().any(|u| u.is_isomorphic(&t)) {
                log::info!("step {}: new structure with {} node(s)", steps, t.node_count());
                reached.push(t.clone());
                work.push(t);
            }
        }
    }

    println!("Reached {} structure(s) in {} step(s)", reached.len(), steps);
    for (i, s) in reached.iter().enumerate() {
        println!("--- structure {} ---", i);
        print!("{}", s.display(ctx.vocabulary()));
    }
    let done = reached.iter().filter(|s| s.count_satisfying(x) == 0).count();
    println!("{} structure(s) with x = null", done);

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}

/// Applies `x = x.n` to a focused structure.
fn step(s: &mut Structure, x: PredicateId, next: &Formula, w: &Var) {
    let values: Vec<(Node, Kleene)> = s
        .nodes()
        .map(|u| (u, s.eval_formula(next, &Assign::single(w.clone(), u))))
        .collect();
    for (u, value) in values {
        s.update(x, &[u], value);
    }
}
