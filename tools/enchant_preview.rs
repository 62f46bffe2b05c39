/// Enchant Preview — turns a reference in a recorded transcript into links.
///
/// Usage: enchant_preview <transcript.ron> (--text <literal> | --hook <name>) [--click]
///
/// Prints the transcript as recorded, then the enchanted output. With
/// `--click`, also activates the first produced link and prints what its
/// action emits. Set `RUST_LOG=debug` to trace matching.

use std::process;

use story_enchant::schema::hook::nodes_in_hook;
use story_enchant::schema::output::render_plain;
use story_enchant::{fragment, Reference, Story};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let transcript_path = &args[1];
    let mut reference = None;
    let mut click = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--text" if i + 1 < args.len() => {
                i += 1;
                reference = Some(Reference::Text(args[i].clone()));
            }
            "--hook" if i + 1 < args.len() => {
                i += 1;
                reference = Some(Reference::Hook(args[i].clone()));
            }
            "--click" => click = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let Some(reference) = reference else {
        eprintln!("ERROR: one of --text or --hook is required");
        print_usage();
        process::exit(1);
    };

    let story = match Story::builder().transcript(transcript_path).build() {
        Ok(story) => story,
        Err(e) => {
            eprintln!("ERROR: Failed to load transcript: {}", e);
            process::exit(1);
        }
    };

    println!("=== Transcript ===\n");
    println!("{}", story.with_output(render_plain));

    if let Reference::Hook(name) = &reference {
        let tagged = story.with_output(|output| nodes_in_hook(output, name).count());
        println!("\n{} nodes tagged with ?{}", tagged, name);
    }

    let cx = story.context().clone();
    let label = match &reference {
        Reference::Text(literal) => literal.clone(),
        Reference::Hook(name) => format!("?{}", name),
    };
    let action = fragment(move || vec![cx.text(format!("(activated {})", label))]);

    let before = story.output_len();
    story.emit(story.enchant_into_link(reference, action));
    let enchanted: Vec<_> = story.output().split_off(before);

    println!("\n=== Enchanted ===\n");
    if enchanted.is_empty() {
        println!("(no matches)");
        return;
    }
    println!("{}", render_plain(&enchanted));

    let links = enchanted.iter().filter(|node| node.as_link().is_some()).count();
    println!("\n{} nodes, {} links", enchanted.len(), links);

    if click {
        let Some(thread) = enchanted.iter().find_map(|node| story.activate_link(node)) else {
            return;
        };
        let before = story.output_len();
        story.run(thread);
        println!("\n=== Clicked ===\n");
        println!("{}", render_plain(&story.output()[before..]));
    }
}

fn print_usage() {
    println!("Usage: enchant_preview <transcript.ron> (--text <literal> | --hook <name>) [--click]");
}
