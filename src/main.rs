use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    shacl_mill::app::run(std::env::args().skip(1))
}
