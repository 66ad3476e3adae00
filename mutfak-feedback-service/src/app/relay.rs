use std::env;
use std::{thread::sleep, time::Duration};

use diesel::result::Error as DieselError;
use diesel::{
    Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper,
};
use kafka::client::RequiredAcks;
use kafka::producer::{Producer, Record};
use mutfak_feedback_service::models::Outbox;
use mutfak_feedback_service::{establish_connection, schema};
use thiserror::Error;
use tracing::{debug, error, info};

const IDLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    #[error("kafka error: {0}")]
    Kafka(#[from] kafka::Error),
}

struct OutboxRelay {
    kafka: Producer,
}

impl OutboxRelay {
    /// Publishes the oldest unlocked outbox row and deletes it in the same
    /// transaction. Returns `false` when the outbox is empty.
    fn relay_next(&mut self, conn: &mut PgConnection) -> Result<bool, RelayError> {
        use schema::outbox::dsl::*;

        conn.transaction::<_, RelayError, _>(|conn| {
            let row = match outbox
                .select(Outbox::as_select())
                .order(id.asc())
                .for_update()
                .skip_locked()
                .first::<Outbox>(conn)
            {
                Ok(row) => row,
                Err(DieselError::NotFound) => return Ok(false),
                Err(err) => return Err(err.into()),
            };

            self.kafka.send(&Record::from_key_value(
                &row.topic,
                row.key.as_bytes(),
                row.value.as_slice(),
            ))?;
            diesel::delete(outbox.filter(id.eq(row.id))).execute(conn)?;

            debug!(id = row.id, topic = %row.topic, "relayed outbox message");
            Ok(true)
        })
    }
}

pub fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let kafka_url = env::var("KAFKA_URL").map_err(|_| "KAFKA_URL must be set")?;

    let conn = &mut establish_connection();
    let producer = Producer::from_hosts(vec![kafka_url])
        .with_ack_timeout(Duration::from_secs(1))
        .with_required_acks(RequiredAcks::One)
        .create()
        .map_err(|err| format!("Cannot connect to Kafka: {err}"))?;
    let mut relay = OutboxRelay { kafka: producer };

    info!("Outbox relay started");
    loop {
        match relay.relay_next(conn) {
            Ok(true) => {}
            Ok(false) => sleep(IDLE_DELAY),
            Err(err) => {
                error!("Error relaying outbox row: {err}");
                sleep(IDLE_DELAY);
            }
        }
    }
}
