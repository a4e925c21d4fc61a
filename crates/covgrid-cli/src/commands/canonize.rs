use crate::support::{
    lexicon_or_exit, load_config_or_exit, print_json_or_exit, print_warnings,
    read_json_file_or_exit,
};
use covgrid_canon::{BlockInput, CanonicalRow, OptionNode, canonize_row, canonize_rows};

pub struct Args {
    pub blocks: String,
    pub row: Option<String>,
    pub options: Option<String>,
    pub config: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = load_config_or_exit(args.config.as_deref());
    let lexicon = lexicon_or_exit(config.canon);
    let mut inputs: Vec<BlockInput> = read_json_file_or_exit(&args.blocks, "blocks");

    if let Some(row_id) = args.row.as_deref() {
        inputs.retain(|b| b.row_id == row_id);
        if inputs.is_empty() {
            eprintln!("error: no blocks for row `{row_id}`");
            std::process::exit(1);
        }
    }

    // clap guarantees --row whenever --options is given.
    let rows = match (args.row.as_deref(), args.options.as_deref()) {
        (Some(row_id), Some(path)) => {
            let options: Vec<OptionNode> = read_json_file_or_exit(path, "options");
            vec![canonize_row(row_id, &inputs, Some(options), &lexicon)]
        }
        _ => canonize_rows(&inputs, &lexicon),
    };

    if args.json {
        print_json_or_exit(&rows, "canonical rows");
    } else {
        println!("covgrid canonize");
        for row in &rows {
            print_row(row);
        }
    }
}

fn print_row(row: &CanonicalRow) {
    println!("  Row {}:", row.row_id);
    println!(
        "    Domain: {:?}  Inheritance cut: {}",
        row.state.domain,
        if row.state.inheritance_cut { "yes" } else { "no" }
    );
    for option in row.active() {
        println!("    + {} ({})", option.id, option.modality.as_str());
    }
    for latent in &row.state.latent_options {
        println!(
            "    - {} latent: {:?} by {} on {}",
            latent.option_id,
            latent.reason,
            latent.source_block,
            latent.scope.as_str()
        );
    }
    print_warnings(&row.warnings);
}
