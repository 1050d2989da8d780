use retain::run_summary::RunSummary;

pub fn print_run_summary(summary: &RunSummary) {
    let elapsed = summary
        .finished_at
        .map(|end| (end - summary.started_at).num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();

    println!("\n{}", "=".repeat(60));
    println!("Summary:");
    match summary.outcome {
        Some(outcome) => println!("  Outcome:    {}", outcome),
        None => println!("  Outcome:    unknown"),
    }
    println!("  Result:     {}", summary.result_subtype.as_deref().unwrap_or("-"));
    println!("  Turns:      {}", summary.num_turns.map_or("-".to_string(), |n| n.to_string()));
    println!("  Tool calls: {}", summary.tool_calls.len());
    for name in &summary.tool_calls {
        println!("    - {}", name);
    }
    println!("  Messages:   {}", summary.assistant_messages);
    println!("  Duration:   {:.2}s", elapsed);
    println!("{}", "=".repeat(60));
}
