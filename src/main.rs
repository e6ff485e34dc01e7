use grpcload::error::AppResult;

fn main() -> AppResult<()> {
    grpcload::entry::run()
}
