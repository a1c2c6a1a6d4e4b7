/// Canned phrase per exact block count, 0 through 7
fn canned(epoch: i64, blocks: i64) -> Option<String> {
    let text = match blocks {
        0 => format!("Llevamos {blocks} bloques firmados, pero tranquilo esto es cosa de paciencia."),
        1 => format!("Ves! ya llevamos {blocks} bloques firmados y vamos por más!"),
        2 => format!("Eso! ya llevamos {blocks} bloques firmados"),
        3 => format!("Incrible! ya son {blocks} bloques firmados y esto no para!"),
        4 => format!("Woooow! ya van {blocks} bloques firmados, este epoch va con todo!"),
        5 => format!("Esto no para! ya son {blocks} bloques firmados, esto esta on fire!"),
        6 => format!("No me la creo... ya son {blocks} bloques firmados!"),
        7 => format!("Ya son {blocks} firmados!"),
        _ => return None,
    };
    Some(format!("epoch {epoch}: {text}"))
}

/// Notification text for `blocks` minted in `epoch`.
///
/// Counts outside the table, negative ones included, get the generic phrase.
pub fn compose(epoch: i64, blocks: i64) -> String {
    canned(epoch, blocks).unwrap_or_else(|| format!("epoch {epoch}: Ya son {blocks} firmados!"))
}
