use pose_match::matching::ReferenceLibrary;
use pose_match::pose::VECTOR_LEN;
use std::env;

fn main() {
    println!("=== ライブラリプローブ ===");
    println!();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "input_image_metadata.json".to_string());
    println!("file: {}", path);

    let library = match ReferenceLibrary::load(&path) {
        Ok(lib) => lib,
        Err(e) => {
            println!("load failed: {:#}", e);
            return;
        }
    };
    println!("entries: {}", library.len());
    println!();

    let mut missing = 0usize;
    let mut wrong_len = 0usize;

    for (index, entry) in library.entries().iter().enumerate() {
        print!("{:>4} {}: ", index, entry.object_id);
        match &entry.l2_vector {
            Some(vector) if vector.len() == VECTOR_LEN => print!("vec={} ok ", vector.len()),
            Some(vector) => {
                print!("vec={} BAD ", vector.len());
                wrong_len += 1;
            }
            None => {
                print!("vec=NONE   ");
                missing += 1;
            }
        }
        println!(
            "image={} \"{}\"",
            entry.filename,
            entry.metadata.display_title()
        );
    }

    println!();
    println!(
        "usable: {} / {} ({} missing vector, {} wrong length)",
        library.usable_count(),
        library.len(),
        missing,
        wrong_len
    );
}
