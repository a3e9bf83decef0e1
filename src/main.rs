use qris_dynamic::{codec::QrImageCodec, configuration::*, Qris, QrisError};

fn main() {
    env_logger::init();

    let conf = Configuration::parse();
    if let Err(e) = run(&conf) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(conf: &Configuration) -> Result<(), QrisError> {
    conf.validate()?;

    let codec = QrImageCodec;
    let mut qris = Qris::from_file(&conf.input, &codec)?;
    log::info!("Loaded payload from {}", conf.input.display());

    if let Some(price) = conf.price {
        qris.set_price(price)?;
        log::info!("Price set to {}", price);
    }
    if let Some(ref tax) = conf.tax {
        qris.set_tax(tax.clone())?;
        log::info!("Service fee set to {}", tax);
    }

    match conf.output {
        Some(ref output) => {
            qris.save(output, &codec, &conf.render_options())?;
            log::info!("Wrote {}", output.display());
        }
        None => println!("{}", qris),
    }

    if conf.info {
        qris.metadata()?.print(conf.format);
    }

    Ok(())
}
