use extendible::{Config, ExtendibleHash};

fn main() {
    env_logger::init();

    let config = Config::new(2).with_events(true);
    let mut index = ExtendibleHash::with_config(config).unwrap();

    for key in [0, 1, 2, 5, 4, 12, 8, 28, 13] {
        println!("Inserting {key}...");
        index.insert(key).unwrap();
        for event in index.take_events() {
            println!("  {event}");
        }
        println!("{index}");
    }

    for key in [13, 28, 12, 99] {
        println!("Deleting {key}...");
        let outcome = index.delete(key).unwrap();
        for event in index.take_events() {
            println!("  {event}");
        }
        println!("{outcome:?}\n{index}");
    }
}
