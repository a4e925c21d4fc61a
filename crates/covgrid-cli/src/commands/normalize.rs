use crate::support::{print_json_or_exit, print_warnings};
use covgrid_kernel::{AtomValue, normalize};

pub fn run(text: String, key: String, json_output: bool) {
    let normalized = normalize(&text, &key);

    if json_output {
        print_json_or_exit(&normalized, "normalized atoms");
        return;
    }

    println!("covgrid normalize");
    for atom in &normalized.atoms {
        let value = match &atom.value {
            Some(AtomValue::Number(n)) => n.to_string(),
            Some(AtomValue::Text(s)) => s.clone(),
            Some(AtomValue::Bool(b)) => b.to_string(),
            None => "-".to_string(),
        };
        println!(
            "  - {:?} -> {} {} {} (confidence {:.2})",
            atom.original_text, atom.atom_type, value, atom.unit, atom.parse_confidence
        );
    }
    print_warnings(&normalized.warnings);
}
