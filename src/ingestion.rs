use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::traits::OperationStream;
use crate::domain::{Amount, Error, Operation, OperationKind};

/// Reads driver operations from CSV: `op,user,email,amount,description`.
///
/// `register` uses `email` (and `description` as the display name), `top_up`
/// uses `amount`, `transfer` uses both. Missing descriptions fall back to the
/// same defaults the dashboard forms use.
pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Ok(Self { reader: Some(rdr) })
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    op: String,
    user: String,
    email: Option<String>,
    amount: Option<Amount>,
    description: Option<String>,
}

impl TryFrom<CsvRow> for Operation {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let kind = match row.op.to_ascii_lowercase().as_str() {
            "register" => {
                let email = row
                    .email
                    .ok_or_else(|| Error::Ingestion("register needs an email".to_owned()))?;
                OperationKind::Register {
                    name: row.description.unwrap_or_else(|| email.clone()),
                    email,
                }
            }
            "top_up" => OperationKind::TopUp {
                amount: row
                    .amount
                    .ok_or_else(|| Error::Ingestion("top_up needs an amount".to_owned()))?,
                description: row.description.unwrap_or_else(|| "Top-up".to_owned()),
            },
            "transfer" => OperationKind::Transfer {
                recipient_email: row
                    .email
                    .ok_or_else(|| Error::Ingestion("transfer needs a recipient email".to_owned()))?,
                amount: row
                    .amount
                    .ok_or_else(|| Error::Ingestion("transfer needs an amount".to_owned()))?,
                description: row.description.unwrap_or_else(|| "Transfer".to_owned()),
            },
            other => {
                return Err(Error::Ingestion(format!("Invalid operation: {}", other)));
            }
        };

        Ok(Operation {
            user_id: row.user,
            kind,
        })
    }
}

impl<R: Read + Send + 'static> OperationStream for CsvReader<R> {
    type OpStream = Pin<Box<dyn Stream<Item = Result<Operation, Error>> + Send>>;

    fn stream(&mut self) -> Self::OpStream {
        // Take ownership of the reader so the iterator we build owns all data
        // and is 'static.
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<Operation, Error>>::new()));
            }
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => Operation::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}
