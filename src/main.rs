fn main() -> anyhow::Result<()> {
    table_ngin::run(table_ngin::TableConfig::default())
}
