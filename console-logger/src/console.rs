use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};

/// Print info on console.
pub fn info(message: &str, data: &str) {
    print(Cyan.bold().italic().paint(message).to_string(), data);
}

/// Print a success notice on console.
pub fn success(message: &str, data: &str) {
    print(Green.bold().paint(message).to_string(), data);
}

/// Print warning on console.
pub fn warn(message: &str, data: &str) {
    print(
        Yellow.bold().italic().paint(message).to_string(),
        &Yellow.paint(data).to_string(),
    );
}

/// Print error on console.
pub fn error(message: &str, data: &str) {
    eprintln!(
        "{} \n {} ",
        Red.bold().paint(message),
        Red.bold().italic().paint(data)
    );
}

fn print(message: String, data: &str) {
    if data.is_empty() {
        println!("{message}");
    } else {
        println!("{message} \n {data} ");
    }
}
