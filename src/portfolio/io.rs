pub mod tx_csv;
