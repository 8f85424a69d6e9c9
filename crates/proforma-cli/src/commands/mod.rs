pub mod proforma;
