use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::{BufRead, Write}; // for env_logger custom formatter and prompts
use std::rc::Rc;

use prize_wheel_client::{
    AppError, AppResult,
    cache::ResponseCache,
    config::Config,
    external::{HttpWheelBackend, WheelBackend},
    models::PaymentDraft,
    services::{AdminReviewService, AnimationOutcome, ReviewOutcome, SettlementState, WheelSession},
    session::{FileStore, KeyValueStore, SessionContext},
};

const USAGE: &str = "usage: prize-wheel <command>

commands:
  login <user-id>
  logout
  prizes
  spin
  history
  claim <record-id> [promptpay <number> | bank <bank-name> <account-number>]
  donate <record-id> <amount> [promptpay <number> | bank <bank-name> <account-number>]
  pending                       (admin)
  transfer <record-id>          (admin)";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::from_toml()?;
    let backend = Rc::new(HttpWheelBackend::new(config.api.clone())?);
    let store: Rc<dyn KeyValueStore> = Rc::new(FileStore::new(&config.session.store_path));
    let session = Rc::new(SessionContext::init(store)?);
    let cache = Rc::new(ResponseCache::new());

    if let Err(e) = run(&args, &config, backend, cache, session).await {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    args: &[String],
    config: &Config,
    backend: Rc<HttpWheelBackend>,
    cache: Rc<ResponseCache>,
    session: Rc<SessionContext>,
) -> AppResult<()> {
    let wheel = WheelSession::new(
        backend.clone(),
        cache.clone(),
        session.clone(),
        config.wheel.clone(),
    );
    let arg = |i: usize| args.get(i).map(String::as_str);

    match arg(0) {
        Some("login") => {
            let user_id = arg(1).ok_or_else(|| usage_error("login needs a user id"))?;
            let user = backend.get_user(user_id).await?;
            println!("Signed in as {} ({} spins left)", user.id, user.spins_remaining);
            session.sign_in(user)?;
        }
        Some("logout") => {
            session.teardown()?;
            println!("Signed out");
        }
        Some("prizes") => {
            for (i, prize) in wheel.catalog().segments().await?.iter().enumerate() {
                let stock = if prize.is_unlimited() {
                    "unlimited".to_string()
                } else {
                    prize.quantity.to_string()
                };
                println!("{:>2}. {} [{}] stock: {stock}", i + 1, prize.name, prize.id);
            }
        }
        Some("spin") => {
            let turn = wheel
                .spin(|prize| println!("You won: {}", prize.name))
                .await?;
            if turn.animation == AnimationOutcome::Ignored {
                println!("The wheel is still turning");
            }
            if let Some(record_id) = &turn.result.spin_record_id {
                println!("Spin record: {record_id}");
            }
            println!("Spins left: {}", turn.result.spins_remaining);
        }
        Some("history") => {
            let user = session.require_user()?;
            for record in wheel.catalog().history(&user.id).await? {
                println!(
                    "{}  {}  {:<24} {:?}",
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.id,
                    record.prize_name.as_deref().unwrap_or(&record.prize_id),
                    record.status
                );
            }
        }
        Some("claim") => {
            let record_id = arg(1).ok_or_else(|| usage_error("claim needs a record id"))?;
            let flow = wheel.settlement(record_id).await?;
            let mut state = flow.claim().await?;
            if let SettlementState::PaymentForm(_) = state {
                let draft = payment_draft(&args[2..])?;
                state = flow.submit_payment(&draft).await?;
            }
            println!("{} settled: {state:?}", flow.prize().name);
        }
        Some("donate") => {
            let record_id = arg(1).ok_or_else(|| usage_error("donate needs a record id"))?;
            let amount = arg(2).ok_or_else(|| usage_error("donate needs an amount"))?;
            let flow = wheel.settlement(record_id).await?;
            flow.donate()?;
            let mut state = flow.confirm_donation(amount).await?;
            if let SettlementState::PaymentForm(_) = state {
                let draft = payment_draft(&args[3..])?;
                state = flow.submit_payment(&draft).await?;
            }
            println!("{} settled: {state:?}", flow.prize().name);
        }
        Some("pending") => {
            let review = AdminReviewService::new(backend, cache, wheel.catalog(), session);
            for record in review.pending_transfers().await? {
                let payout = record
                    .payment_info
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |p| p.describe());
                println!("{}  user {}  {:?}  {payout}", record.id, record.user_id, record.status);
            }
        }
        Some("transfer") => {
            let record_id = arg(1).ok_or_else(|| usage_error("transfer needs a record id"))?;
            let review = AdminReviewService::new(backend, cache, wheel.catalog(), session);
            match review.mark_transferred(record_id, &prompt_yes_no).await? {
                ReviewOutcome::Transferred => println!("Record {record_id} marked transferred"),
                ReviewOutcome::Declined => println!("Nothing changed"),
            }
        }
        _ => println!("{USAGE}"),
    }
    Ok(())
}

fn payment_draft(args: &[String]) -> AppResult<PaymentDraft> {
    match args {
        [method, number] if method == "promptpay" => Ok(PaymentDraft::promptpay(number.as_str())),
        [method, bank, account] if method == "bank" => {
            Ok(PaymentDraft::bank(bank.as_str(), account.as_str()))
        }
        _ => Err(AppError::ValidationError(
            "Payout details required: promptpay <number> | bank <bank-name> <account-number>"
                .into(),
        )),
    }
}

fn usage_error(msg: &str) -> AppError {
    AppError::ValidationError(format!("{msg}\n\n{USAGE}"))
}

fn prompt_yes_no(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}
